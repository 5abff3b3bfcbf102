use crate::lead::Lead;

use super::image::InkMask;
use super::segment::Panel;

/// A lead panel serialized to 32-bit words.
///
/// Sample `(x, y)` is bit `i % 32` of word `i / 32`, where `i = y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedPanel {
    pub lead: Lead,
    pub calibration_unit: u64,
    pub width: u32,
    pub height: u32,
    pub words: Vec<u32>,
}

impl PackedPanel {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Read back the sample at (x, y).
    #[inline]
    pub fn bit(&self, x: u32, y: u32) -> bool {
        let i = y as usize * self.width as usize + x as usize;
        (self.words[i / 32] >> (i % 32)) & 1 == 1
    }
}

/// Number of words needed for `width × height` samples.
pub fn word_count(width: u32, height: u32) -> usize {
    (width as usize * height as usize).div_ceil(32)
}

/// Pack a mask's samples row-major into 32-bit words.
pub fn pack_mask(mask: &InkMask) -> Vec<u32> {
    let mut words = vec![0u32; word_count(mask.width, mask.height)];
    for (i, _) in mask.buf.iter().enumerate().filter(|(_, &v)| v) {
        words[i / 32] |= 1 << (i % 32);
    }
    words
}

/// Pack a panel, carrying its lead and calibration along.
pub fn pack(panel: &Panel) -> PackedPanel {
    PackedPanel {
        lead: panel.lead,
        calibration_unit: panel.calibration_unit,
        width: panel.width(),
        height: panel.height(),
        words: pack_mask(&panel.mask),
    }
}

/// Restore the mask of a packed panel.
pub fn unpack(packed: &PackedPanel) -> InkMask {
    assert!(packed.words.len() >= word_count(packed.width, packed.height));
    let n = packed.width as usize * packed.height as usize;
    let buf = (0..n)
        .map(|i| (packed.words[i / 32] >> (i % 32)) & 1 == 1)
        .collect();
    InkMask::from_buf(packed.width, packed.height, buf)
}
