use crate::style::{LINE_HEIGHT, PADDING};

/// Number of text rows that fit in a box of `height` pixels.
pub fn rows_for_height(height: f32) -> usize {
    ((height - 2.0 * PADDING) / LINE_HEIGHT).floor().max(0.0) as usize
}

/// Picks the slice of `len` lines shown in `rows` rows, `scroll` lines up
/// from the bottom. Returns the first visible line and the clamped scroll.
pub fn visible_window(len: usize, rows: usize, scroll: usize) -> (usize, usize) {
    let scroll = scroll.min(len.saturating_sub(rows));
    let start = len.saturating_sub(rows + scroll).min(len.saturating_sub(1));
    (start, scroll)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_fit_inside_padding() {
        assert_eq!(rows_for_height(LINE_HEIGHT * 3.0 + 2.0 * PADDING), 3);
        assert_eq!(rows_for_height(LINE_HEIGHT * 3.0), 2);
        assert_eq!(rows_for_height(0.0), 0);
    }

    #[test]
    fn window_tails_the_log() {
        assert_eq!(visible_window(10, 4, 0), (6, 0));
        assert_eq!(visible_window(10, 4, 2), (4, 2));
        // scrolled past the top
        assert_eq!(visible_window(10, 4, 50), (0, 6));
        // fewer lines than rows
        assert_eq!(visible_window(3, 4, 1), (0, 0));
        assert_eq!(visible_window(0, 4, 0), (0, 0));
    }
}
