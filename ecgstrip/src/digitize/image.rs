use crate::error::DigitizeError;

/// Decoded RGB image with row-major, tightly packed 3-byte pixels.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    buf: Vec<u8>,
}

impl PixelGrid {
    /// Wrap an RGB buffer of exactly `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, buf: Vec<u8>) -> Result<Self, DigitizeError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 3;
        if buf.len() != expected {
            return Err(DigitizeError::BufferLength {
                expected,
                actual: buf.len(),
            });
        }
        Ok(Self { width, height, buf })
    }

    /// Build from an RGBA buffer, dropping the alpha channel.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, DigitizeError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(DigitizeError::BufferLength {
                expected,
                actual: rgba.len(),
            });
        }
        let buf = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(Self { width, height, buf })
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> [u8; 3],
    ) -> Result<Self, DigitizeError> {
        check_dimensions(width, height)?;
        let mut buf = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                buf.extend_from_slice(&f(x, y));
            }
        }
        Ok(Self { width, height, buf })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB samples.
    pub fn as_raw(&self) -> &[u8] {
        &self.buf
    }

    /// Get the (R, G, B) triple at (x, y).
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.buf[i], self.buf[i + 1], self.buf[i + 2]]
    }

    /// Iterate the pixels of row `y` as (R, G, B) triples.
    pub fn row(&self, y: u32) -> impl Iterator<Item = [u8; 3]> + '_ {
        let stride = self.width as usize * 3;
        let start = y as usize * stride;
        self.buf[start..start + stride]
            .chunks_exact(3)
            .map(|px| [px[0], px[1], px[2]])
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), DigitizeError> {
    if width == 0 || height == 0 {
        return Err(DigitizeError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Boolean ink/background mask with row-major pixel data.
///
/// `true` marks an ink (trace) pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InkMask {
    pub width: u32,
    pub height: u32,
    pub buf: Vec<bool>,
}

impl InkMask {
    /// Create an all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        let buf = vec![false; width as usize * height as usize];
        Self { width, height, buf }
    }

    /// Create a mask from existing row-major data.
    ///
    /// `buf` must contain exactly `width * height` samples.
    pub fn from_buf(width: u32, height: u32, buf: Vec<bool>) -> Self {
        assert_eq!(buf.len(), width as usize * height as usize);
        Self { width, height, buf }
    }

    #[inline]
    fn idx(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the sample at (x, y).
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.buf[self.idx(x, y)]
    }

    /// Set the sample at (x, y).
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, val: bool) {
        let i = self.idx(x, y);
        self.buf[i] = val;
    }

    /// Row `y` as a slice.
    pub fn row(&self, y: u32) -> &[bool] {
        debug_assert_eq!(
            self.buf.len(),
            self.width as usize * self.height as usize,
            "mask buffer does not match {}x{}",
            self.width,
            self.height
        );
        let w = self.width as usize;
        let start = y as usize * w;
        &self.buf[start..start + w]
    }

    /// Ink pixel count of every row, top to bottom.
    pub fn row_counts(&self) -> Vec<u32> {
        (0..self.height)
            .map(|y| self.row(y).iter().filter(|&&v| v).count() as u32)
            .collect()
    }

    /// Ink pixel count of column `x`.
    pub fn column_count(&self, x: u32) -> u32 {
        (0..self.height).filter(|&y| self.get(x, y)).count() as u32
    }

    /// Total number of ink pixels.
    pub fn count_ink(&self) -> usize {
        self.buf.iter().filter(|&&v| v).count()
    }

    /// Copy out the rectangle `[x0, x0 + w) × [y0, y0 + h)`.
    pub fn crop(&self, x0: u32, y0: u32, w: u32, h: u32) -> InkMask {
        assert!(x0 + w <= self.width && y0 + h <= self.height);
        let mut buf = Vec::with_capacity(w as usize * h as usize);
        for y in y0..y0 + h {
            let row = self.row(y);
            buf.extend_from_slice(&row[x0 as usize..(x0 + w) as usize]);
        }
        InkMask::from_buf(w, h, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_blank_mask() {
        let m = InkMask::new(10, 8);
        assert_eq!(m.width, 10);
        assert_eq!(m.height, 8);
        assert_eq!(m.buf.len(), 80);
        assert_eq!(m.count_ink(), 0);
    }

    #[test]
    fn get_set_sample() {
        let mut m = InkMask::new(4, 4);
        m.set(2, 3, true);
        assert!(m.get(2, 3));
        assert!(!m.get(3, 2));
        assert_eq!(m.row_counts(), vec![0, 0, 0, 1]);
        assert_eq!(m.column_count(2), 1);
    }

    #[test]
    fn crop_copies_rectangle() {
        let mut m = InkMask::new(5, 5);
        m.set(1, 1, true);
        m.set(3, 2, true);
        let c = m.crop(1, 1, 3, 2);
        assert_eq!((c.width, c.height), (3, 2));
        assert!(c.get(0, 0));
        assert!(c.get(2, 1));
        assert_eq!(c.count_ink(), 2);
    }

    #[test]
    fn rgb_round_trip() {
        let grid = PixelGrid::from_rgb(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(grid.rgb(1, 0), [4, 5, 6]);
        assert_eq!(grid.row(0).collect::<Vec<_>>(), vec![[1, 2, 3], [4, 5, 6]]);
    }

    #[test]
    fn rgba_drops_alpha() {
        let grid = PixelGrid::from_rgba(1, 2, &[10, 20, 30, 255, 40, 50, 60, 0]).unwrap();
        assert_eq!(grid.rgb(0, 0), [10, 20, 30]);
        assert_eq!(grid.rgb(0, 1), [40, 50, 60]);
    }

    #[test]
    fn rejects_bad_buffers() {
        assert!(matches!(
            PixelGrid::from_rgb(2, 2, vec![0; 11]),
            Err(DigitizeError::BufferLength { expected: 12, actual: 11 })
        ));
        assert!(matches!(
            PixelGrid::from_rgb(0, 2, Vec::new()),
            Err(DigitizeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn from_fn_fills_row_major() {
        let grid = PixelGrid::from_fn(3, 2, |x, y| [x as u8, y as u8, 7]).unwrap();
        assert_eq!(grid.rgb(2, 1), [2, 1, 7]);
        assert_eq!(grid.as_raw().len(), 18);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "mask buffer does not match")]
    fn mismatched_mask_buffer_is_caught() {
        let mut m = InkMask::new(4, 3);
        m.buf.truncate(8);
        let _ = m.row(0);
    }
}
