use crate::lead::{Lead, LEAD_COUNT};

use super::image::InkMask;
use super::separator::{Separators, SEPARATOR_COUNT};

/// Number of horizontal zones on a strip; the outer two hold legends.
pub const ZONE_COUNT: usize = SEPARATOR_COUNT + 1;

/// How the strip was split into zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum SegmentLayout {
    /// Zones bounded by detected whitespace cut lines.
    Separators { lines: [u32; SEPARATOR_COUNT] },
    /// Equal-height zones, used when separator detection fails.
    Fallback,
}

impl SegmentLayout {
    pub fn from_separators(separators: Option<Separators>) -> Self {
        match separators {
            Some(s) => SegmentLayout::Separators { lines: s.0 },
            None => SegmentLayout::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SegmentLayout::Fallback)
    }

    /// The seven horizontal lines actually used to cut a mask of `height`.
    pub fn cut_lines(&self, height: u32) -> [u32; SEPARATOR_COUNT] {
        match self {
            SegmentLayout::Separators { lines } => *lines,
            SegmentLayout::Fallback => {
                let row_h = height / ZONE_COUNT as u32;
                std::array::from_fn(|i| (i as u32 + 1) * row_h)
            }
        }
    }

    /// Zone boundaries `[0, line1..line7, height]`.
    pub fn zone_bounds(&self, height: u32) -> [u32; ZONE_COUNT + 1] {
        let lines = self.cut_lines(height);
        let mut bounds = [0u32; ZONE_COUNT + 1];
        bounds[1..=SEPARATOR_COUNT].copy_from_slice(&lines);
        bounds[ZONE_COUNT] = height;
        bounds
    }
}

/// One segmented lead trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub lead: Lead,
    pub mask: InkMask,
    pub calibration_unit: u64,
}

impl Panel {
    pub fn width(&self) -> u32 {
        self.mask.width
    }

    pub fn height(&self) -> u32 {
        self.mask.height
    }
}

/// Column at which the strip splits into limb (left) and chest (right) leads.
pub fn midline(width: u32) -> u32 {
    width / 2
}

/// Cut the six lead zones into left and right halves, in output lead order.
fn split_zones(mask: &InkMask, layout: &SegmentLayout) -> Vec<InkMask> {
    let bounds = layout.zone_bounds(mask.height);
    let half = midline(mask.width);

    let mut left = Vec::with_capacity(LEAD_COUNT / 2);
    let mut right = Vec::with_capacity(LEAD_COUNT / 2);
    for zone in 1..ZONE_COUNT - 1 {
        let y1 = bounds[zone];
        let y2 = bounds[zone + 1].max(y1);
        let seg_h = y2 - y1;
        left.push(mask.crop(0, y1, half, seg_h));
        right.push(mask.crop(half, y1, mask.width - half, seg_h));
    }
    left.extend(right);
    left
}

/// Crop `mask` to `w × h` around its centre.
fn center_crop(mask: &InkMask, w: u32, h: u32) -> InkMask {
    let x0 = (mask.width - w) / 2;
    let y0 = (mask.height - h) / 2;
    mask.crop(x0, y0, w, h)
}

/// Drop `ratio` of the width from both the left and right edge. Leaves the
/// mask alone if nothing would remain.
fn trim_sides(mask: &InkMask, ratio: f64) -> InkMask {
    let cut = (mask.width as f64 * ratio) as u32;
    if cut * 2 >= mask.width {
        return mask.clone();
    }
    mask.crop(cut, 0, mask.width - 2 * cut, mask.height)
}

/// Partition the mask into twelve equally sized lead panels.
///
/// Panels come back in `Lead::ALL` order, centre-cropped to the smallest
/// panel size and with `trim_ratio` of their width removed from each side.
pub fn segment(
    mask: &InkMask,
    layout: &SegmentLayout,
    calibration_unit: u64,
    trim_ratio: f64,
) -> Vec<Panel> {
    let pieces = split_zones(mask, layout);

    let min_w = pieces.iter().map(|p| p.width).min().unwrap_or(0);
    let min_h = pieces.iter().map(|p| p.height).min().unwrap_or(0);

    pieces
        .iter()
        .zip(Lead::ALL)
        .map(|(piece, lead)| {
            let cropped = center_crop(piece, min_w, min_h);
            Panel {
                lead,
                mask: trim_sides(&cropped, trim_ratio),
                calibration_unit,
            }
        })
        .collect()
}
