//! Binary wire frames: raw strip uploads in, packed lead panels out.
//!
//! Every integer is a big-endian 32-bit word.

use anyhow::{bail, ensure, Context, Result};
use ecgstrip::digitize::image::PixelGrid;
use ecgstrip::digitize::pack::PackedPanel;
use ecgstrip::lead::Lead;

const HEADER_LEN: usize = 8;

/// Decode an upload frame: `width`, `height`, then one word per pixel laid
/// out as `[_, B, G, R]`.
pub fn decode_raw_frame(bytes: &[u8]) -> Result<PixelGrid> {
    ensure!(
        bytes.len() >= HEADER_LEN,
        "raw frame is {} bytes, shorter than its header",
        bytes.len()
    );
    let width = read_i32(bytes, 0);
    let height = read_i32(bytes, 4);
    if width <= 0 || height <= 0 {
        bail!("raw frame has invalid dimensions {width}x{height}");
    }

    let pixels = &bytes[HEADER_LEN..];
    let expected = width as usize * height as usize * 4;
    ensure!(
        pixels.len() == expected,
        "raw frame holds {} pixel bytes, expected {expected} for {width}x{height}",
        pixels.len()
    );

    let rgb: Vec<u8> = pixels
        .chunks_exact(4)
        .flat_map(|px| [px[3], px[2], px[1]])
        .collect();
    PixelGrid::from_rgb(width as u32, height as u32, rgb).context("raw frame rejected")
}

/// Encode panels as a response frame: panel count, then per panel
/// `calibration, width, height, word count, words...`.
pub fn encode_response(panels: &[PackedPanel]) -> Result<Vec<u8>> {
    let total_words = 1 + panels.iter().map(|p| 4 + p.words.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total_words * 4);

    out.extend_from_slice(&to_word(panels.len(), "panel count")?.to_be_bytes());
    for panel in panels {
        let header = [
            to_word(panel.calibration_unit, "calibration unit")?,
            panel.width,
            panel.height,
            to_word(panel.word_count(), "word count")?,
        ];
        for word in header.iter().chain(&panel.words) {
            out.extend_from_slice(&word.to_be_bytes());
        }
    }
    Ok(out)
}

/// Parse a response frame back into panels, assigning leads by position.
pub fn decode_response(bytes: &[u8]) -> Result<Vec<PackedPanel>> {
    ensure!(
        bytes.len() % 4 == 0,
        "response frame length {} is not a multiple of 4",
        bytes.len()
    );
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .collect();

    let mut rest = words.as_slice();
    let count = take(&mut rest, 1)?[0] as usize;
    let mut panels = Vec::with_capacity(count);
    for index in 0..count {
        let lead = Lead::from_index(index)
            .with_context(|| format!("response frame carries more than 12 panels ({count})"))?;
        let header = take(&mut rest, 4)?;
        let words = take(&mut rest, header[3] as usize)?.to_vec();
        panels.push(PackedPanel {
            lead,
            calibration_unit: header[0] as u64,
            width: header[1],
            height: header[2],
            words,
        });
    }
    ensure!(rest.is_empty(), "{} trailing words after last panel", rest.len());
    Ok(panels)
}

fn take<'a>(rest: &mut &'a [u32], n: usize) -> Result<&'a [u32]> {
    ensure!(rest.len() >= n, "response frame truncated");
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    Ok(head)
}

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn to_word<T>(value: T, what: &str) -> Result<u32>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| anyhow::anyhow!("{what} {value} does not fit a 32-bit word"))
}
