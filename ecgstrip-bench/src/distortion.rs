/// Print and scan artefacts applied to a composed strip.
use serde::{Deserialize, Serialize};

/// An artefact to apply after scene composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Distortion {
    /// Isolated specks in `color` at the given per-pixel density.
    Specks {
        density: f64,
        color: [u8; 3],
        seed: u64,
    },
    /// Blend every pixel toward white: `c + (255 - c) * factor`.
    Fade { factor: f64 },
    /// Fill a rectangle `[x, y, w, h]` with a solid colour.
    Paint { rect: [u32; 4], color: [u8; 3] },
}

/// Row-major RGB canvas the scene is drawn on.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, color: [u8; 3]) -> Self {
        let rgb = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self { width, height, rgb }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// Set a pixel; out-of-bounds writes are dropped.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * 3;
            self.rgb[i..i + 3].copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
        let x1 = x0.saturating_add(w).min(self.width);
        let y1 = y0.saturating_add(h).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                self.set(x, y, color);
            }
        }
    }
}

/// Apply a sequence of distortions to a canvas in place.
pub fn apply(canvas: &mut Canvas, distortions: &[Distortion]) {
    for d in distortions {
        apply_one(canvas, d);
    }
}

fn apply_one(canvas: &mut Canvas, d: &Distortion) {
    match d {
        Distortion::Specks {
            density,
            color,
            seed,
        } => apply_specks(canvas, *density, *color, *seed),
        Distortion::Fade { factor } => apply_fade(canvas, *factor),
        Distortion::Paint { rect, color } => {
            canvas.fill_rect(rect[0], rect[1], rect[2], rect[3], *color)
        }
    }
}

/// Simple LCG pseudo-random number generator (deterministic, no_std compatible).
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        // LCG with Knuth's constants
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Generate a uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn apply_specks(canvas: &mut Canvas, density: f64, color: [u8; 3], seed: u64) {
    let mut rng = Rng::new(seed);
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            if rng.next_f64() < density {
                canvas.set(x, y, color);
            }
        }
    }
}

fn apply_fade(canvas: &mut Canvas, factor: f64) {
    let factor = factor.clamp(0.0, 1.0);
    for c in canvas.rgb.iter_mut() {
        *c = (*c as f64 + (255.0 - *c as f64) * factor) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_deterministic() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let f = Rng::new(3).next_f64();
        assert!((0.0..1.0).contains(&f));
    }

    #[test]
    fn specks_density_roughly_matches() {
        let mut canvas = Canvas::new(200, 200, [255, 255, 255]);
        apply(
            &mut canvas,
            &[Distortion::Specks {
                density: 0.05,
                color: [0, 0, 200],
                seed: 1,
            }],
        );
        let specks = (0..200)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.get(x, y) == [0, 0, 200])
            .count();
        assert!((1500..2500).contains(&specks), "{specks} specks");
    }

    #[test]
    fn fade_moves_toward_white() {
        let mut canvas = Canvas::new(1, 1, [230, 30, 30]);
        apply(&mut canvas, &[Distortion::Fade { factor: 0.3 }]);
        assert_eq!(canvas.get(0, 0), [237, 97, 97]);
    }

    #[test]
    fn paint_clips_to_canvas() {
        let mut canvas = Canvas::new(10, 10, [255, 255, 255]);
        apply(
            &mut canvas,
            &[Distortion::Paint {
                rect: [8, 8, 5, 5],
                color: [0, 0, 0],
            }],
        );
        assert_eq!(canvas.get(9, 9), [0, 0, 0]);
        assert_eq!(canvas.get(7, 9), [255, 255, 255]);
    }
}
