use super::image::InkMask;

/// Clear isolated ink pixels in a single pass.
///
/// Neighbourhoods are read from `mask`, so a pixel cleared here never makes a
/// neighbour look isolated within the same pass. Pixels on the image border
/// are left untouched.
pub fn remove_isolated(mask: &InkMask) -> InkMask {
    let mut out = mask.clone();
    let w = mask.width;
    let h = mask.height;
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if !mask.get(x, y) {
                continue;
            }
            let has_neighbour = (-1..=1i32).any(|dy| {
                (-1..=1i32).any(|dx| {
                    (dx != 0 || dy != 0)
                        && mask.get((x as i32 + dx) as u32, (y as i32 + dy) as u32)
                })
            });
            if !has_neighbour {
                out.set(x, y, false);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_pixel_cleared() {
        let mut m = InkMask::new(5, 5);
        m.set(2, 2, true);
        let out = remove_isolated(&m);
        assert_eq!(out.count_ink(), 0);
    }

    #[test]
    fn diagonal_pair_survives() {
        let mut m = InkMask::new(5, 5);
        m.set(1, 1, true);
        m.set(2, 2, true);
        let out = remove_isolated(&m);
        assert!(out.get(1, 1));
        assert!(out.get(2, 2));
    }

    #[test]
    fn border_pixels_never_cleared() {
        let mut m = InkMask::new(5, 5);
        m.set(0, 0, true);
        m.set(4, 2, true);
        m.set(2, 4, true);
        let out = remove_isolated(&m);
        assert_eq!(out, m);
    }

    #[test]
    fn judged_against_input_mask() {
        let mut m = InkMask::new(7, 7);
        m.set(2, 2, true);
        m.set(3, 3, true);
        m.set(5, 5, true);
        let out = remove_isolated(&m);
        assert!(out.get(2, 2));
        assert!(out.get(3, 3));
        assert!(!out.get(5, 5));
    }

    #[test]
    fn pixel_supported_only_by_border_survives() {
        let mut m = InkMask::new(6, 6);
        m.set(1, 0, true);
        m.set(1, 1, true);
        let out = remove_isolated(&m);
        assert!(out.get(1, 1));
        assert!(out.get(1, 0));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let m = InkMask::from_buf(
            9,
            9,
            (0..81).map(|i| (i * 7 + i / 9) % 5 == 0).collect(),
        );
        let once = remove_isolated(&m);
        let twice = remove_isolated(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn tiny_masks_unchanged() {
        let mut m = InkMask::new(2, 2);
        m.set(0, 0, true);
        assert_eq!(remove_isolated(&m), m);
    }
}
