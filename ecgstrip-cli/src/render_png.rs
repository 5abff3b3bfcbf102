//! PNG output for lead bitmaps and the segmentation overlay.

use anyhow::{Context, Result};
use ecgstrip::digitize::digitizer::{LeadSink, OverlayGeometry};
use ecgstrip::digitize::image::PixelGrid;
use ecgstrip::digitize::pack::PackedPanel;
use ecgstrip::lead::Lead;
use std::path::{Path, PathBuf};

const OVERLAY_RED: [u8; 3] = [255, 0, 0];
const LINE_WIDTH: u32 = 2;

/// Writes each lead as `<dir>/<lead>.png`, ink black on white.
pub struct PngLeadSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngLeadSink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating lead directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl LeadSink for PngLeadSink {
    type Error = anyhow::Error;

    fn write_lead(&mut self, lead: Lead, panel: &PackedPanel) -> Result<()> {
        let path = self.dir.join(format!("{lead}.png"));
        let pixels = panel_pixels(panel);
        write_png(&path, &pixels, panel.width, panel.height, png::ColorType::Grayscale)?;
        self.written.push(path);
        Ok(())
    }
}

/// Grayscale rendering of a packed panel.
fn panel_pixels(panel: &PackedPanel) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(panel.width as usize * panel.height as usize);
    for y in 0..panel.height {
        for x in 0..panel.width {
            pixels.push(if panel.bit(x, y) { 0 } else { 255 });
        }
    }
    pixels
}

/// RGB rendering of the margin-trimmed input with cut lines and midline.
fn overlay_pixels(grid: &PixelGrid, overlay: &OverlayGeometry) -> Vec<u8> {
    let (w, h) = (overlay.width, overlay.height);
    let mut pixels = Vec::with_capacity(w as usize * h as usize * 3);
    for y in 0..h {
        for x in 0..w {
            pixels.extend_from_slice(&grid.rgb(x + overlay.margin, y));
        }
    }

    let mut paint = |x: u32, y: u32| {
        if x < w && y < h {
            let i = (y as usize * w as usize + x as usize) * 3;
            pixels[i..i + 3].copy_from_slice(&OVERLAY_RED);
        }
    };
    for &line in &overlay.lines {
        for y in line..line + LINE_WIDTH {
            for x in 0..w {
                paint(x, y);
            }
        }
    }
    for x in overlay.midline..overlay.midline + LINE_WIDTH {
        for y in 0..h {
            paint(x, y);
        }
    }
    pixels
}

/// Write the segmentation overlay for `grid` to `path`.
pub fn write_overlay(grid: &PixelGrid, overlay: &OverlayGeometry, path: &Path) -> Result<()> {
    let pixels = overlay_pixels(grid, overlay);
    write_png(path, &pixels, overlay.width, overlay.height, png::ColorType::Rgb)
}

fn write_png(
    path: &Path,
    pixels: &[u8],
    width: u32,
    height: u32,
    color: png::ColorType,
) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let w = std::io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder
        .write_header()
        .with_context(|| format!("writing PNG header for {}", path.display()))?;
    writer
        .write_image_data(pixels)
        .with_context(|| format!("writing PNG data for {}", path.display()))?;

    Ok(())
}
