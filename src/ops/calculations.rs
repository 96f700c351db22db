//! Pure geometry helpers.
//!
//! All functions here are pure and testable without any images.

/// Balance the margins on one axis of a crop box.
///
/// `offset`/`extent` describe the box along an axis of length `total`. The
/// far margin is `total - offset - extent`. When it is larger than the near
/// margin the box grows towards the far edge; when smaller, the box starts at
/// the far margin's distance and grows by the difference. Either way both
/// margins end up equal to the smaller of the two.
///
/// # Examples
/// ```
/// # use imgpipe::ops::equalize_margins;
/// // 10px left, 10px right: already balanced
/// assert_eq!(equalize_margins(10, 80, 100), (10, 80));
/// // 5px left, 15px right: extend right
/// assert_eq!(equalize_margins(5, 80, 100), (5, 90));
/// // 15px left, 5px right: extend left
/// assert_eq!(equalize_margins(15, 80, 100), (5, 90));
/// ```
pub fn equalize_margins(offset: u32, extent: u32, total: u32) -> (u32, u32) {
    let far = total.saturating_sub(offset).saturating_sub(extent);
    if far > offset {
        (offset, extent + (far - offset))
    } else if far < offset {
        (far, extent + (offset - far))
    } else {
        (offset, extent)
    }
}

/// Output length of one axis after scaling. Never less than one pixel.
pub fn scaled_extent(extent: u32, scale: f64) -> u32 {
    ((extent as f64 * scale).round() as u32).max(1)
}

/// Dimensions that cover `target` while keeping the source aspect ratio.
///
/// Both returned edges are at least the target's; one matches it exactly.
pub fn cover_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    let scale = (tgt_w as f64 / src_w as f64).max(tgt_h as f64 / src_h as f64);
    (
        scaled_extent(src_w, scale).max(tgt_w),
        scaled_extent(src_h, scale).max(tgt_h),
    )
}

/// Position of the window that sits closest to centred, used to break ties.
pub(crate) fn centre_offset(total: u32, window: u32) -> u32 {
    total.saturating_sub(window) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // equalize_margins
    // =========================================================================

    #[test]
    fn balanced_margins_unchanged() {
        assert_eq!(equalize_margins(10, 80, 100), (10, 80));
    }

    #[test]
    fn larger_far_margin_grows_extent() {
        // right = 100 - 5 - 80 = 15, diff 10
        assert_eq!(equalize_margins(5, 80, 100), (5, 90));
    }

    #[test]
    fn larger_near_margin_moves_offset() {
        // right = 100 - 20 - 70 = 10, diff -10
        let (offset, extent) = equalize_margins(20, 70, 100);
        assert_eq!((offset, extent), (10, 80));
        assert_eq!(100 - offset - extent, offset);
    }

    #[test]
    fn full_width_box_untouched() {
        assert_eq!(equalize_margins(0, 100, 100), (0, 100));
    }

    #[test]
    fn zero_extent_box_grows_to_far_edge() {
        // Used before the degenerate-box check; stays in bounds.
        let (offset, extent) = equalize_margins(0, 0, 10);
        assert!(offset + extent <= 10);
    }

    // =========================================================================
    // scaled_extent / cover_dimensions
    // =========================================================================

    #[test]
    fn scaled_extent_rounds_and_never_reaches_zero() {
        assert_eq!(scaled_extent(100, 0.5), 50);
        assert_eq!(scaled_extent(3, 0.5), 2);
        assert_eq!(scaled_extent(10, 0.001), 1);
    }

    #[test]
    fn cover_landscape_into_square() {
        assert_eq!(cover_dimensions((400, 200), (100, 100)), (200, 100));
    }

    #[test]
    fn cover_portrait_into_landscape() {
        assert_eq!(cover_dimensions((200, 400), (100, 50)), (100, 200));
    }

    #[test]
    fn cover_square_source() {
        // Square sources still scale to the dominant target edge.
        assert_eq!(cover_dimensions((300, 300), (100, 60)), (100, 100));
    }

    #[test]
    fn centre_offset_halves_the_slack() {
        assert_eq!(centre_offset(100, 40), 30);
        assert_eq!(centre_offset(10, 20), 0);
    }
}
