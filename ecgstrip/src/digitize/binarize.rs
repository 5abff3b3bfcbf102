use super::image::{InkMask, PixelGrid};

/// Channel cut-offs for ink classification.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BinarizeParams {
    /// Red and green must both be below this for a pixel to count as ink.
    pub ink_max: u8,
    /// Red and green below this (with blue below `dark_blue_max`) is dark
    /// background print, not trace.
    pub dark_max: u8,
    pub dark_blue_max: u8,
}

impl Default for BinarizeParams {
    fn default() -> Self {
        Self {
            ink_max: 200,
            dark_max: 150,
            dark_blue_max: 120,
        }
    }
}

impl BinarizeParams {
    /// Classify one pixel.
    #[inline]
    pub fn classify(&self, r: u8, g: u8, b: u8) -> bool {
        let ink = r < self.ink_max && g < self.ink_max;
        let dark = r < self.dark_max && g < self.dark_max && b < self.dark_blue_max;
        ink && !dark
    }
}

/// Classify one pixel with the default cut-offs.
#[inline]
pub fn is_ink(r: u8, g: u8, b: u8) -> bool {
    BinarizeParams::default().classify(r, g, b)
}

/// Produce an ink mask from an RGB grid. Each pixel is classified on its own.
pub fn binarize(grid: &PixelGrid, params: &BinarizeParams) -> InkMask {
    let buf = grid
        .as_raw()
        .chunks_exact(3)
        .map(|px| params.classify(px[0], px[1], px[2]))
        .collect();
    InkMask::from_buf(grid.width(), grid.height(), buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_is_background() {
        assert!(!is_ink(255, 255, 255));
        assert!(!is_ink(200, 100, 100));
        assert!(!is_ink(100, 200, 100));
    }

    #[test]
    fn mid_tone_is_ink() {
        assert!(is_ink(199, 199, 0));
        assert!(is_ink(160, 160, 160));
        // Dark in red/green but blue too strong to be the dark override.
        assert!(is_ink(100, 100, 120));
    }

    #[test]
    fn dark_override_is_background() {
        assert!(!is_ink(0, 0, 0));
        assert!(!is_ink(149, 149, 119));
        assert!(is_ink(150, 149, 119));
    }

    #[test]
    fn classification_is_pure() {
        let grid = PixelGrid::from_fn(16, 16, |x, y| {
            let v = ((x * 31 + y * 17) % 256) as u8;
            [v, v.wrapping_mul(3), v.wrapping_add(90)]
        })
        .unwrap();
        let a = binarize(&grid, &BinarizeParams::default());
        let b = binarize(&grid, &BinarizeParams::default());
        assert_eq!(a, b);
        for y in 0..16 {
            for x in 0..16 {
                let [r, g, bl] = grid.rgb(x, y);
                assert_eq!(a.get(x, y), is_ink(r, g, bl), "({x}, {y})");
            }
        }
    }

    #[test]
    fn custom_params_shift_cutoff() {
        let params = BinarizeParams {
            ink_max: 100,
            ..BinarizeParams::default()
        };
        assert!(!params.classify(160, 160, 160));
    }
}
