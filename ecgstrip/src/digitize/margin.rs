use super::image::InkMask;

/// Minimum ink pixels in a column for it to count as strip content.
pub const MARGIN_MIN_INK: u32 = 10;

/// Index of the first column holding at least `min_ink` ink pixels, or 0 if
/// no column does.
pub fn find_left_margin(mask: &InkMask, min_ink: u32) -> u32 {
    (0..mask.width)
        .find(|&x| mask.column_count(x) >= min_ink)
        .unwrap_or(0)
}

/// Strip the empty left margin. Returns the trimmed mask and the number of
/// columns removed.
pub fn trim_left_margin(mask: &InkMask, min_ink: u32) -> (InkMask, u32) {
    let margin = find_left_margin(mask, min_ink);
    if margin == 0 {
        return (mask.clone(), 0);
    }
    let trimmed = mask.crop(margin, 0, mask.width - margin, mask.height);
    (trimmed, margin)
}
