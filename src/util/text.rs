use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ELLIPSIS: char = '\u{2026}';

/// Width of `s` in terminal cells
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `max_cells` cells, ending in `…` when anything was cut.
/// Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut out = String::new();
    for grapheme in s.graphemes(true) {
        let w = UnicodeWidthStr::width(grapheme);
        if width + w > budget {
            break;
        }
        width += w;
        out.push_str(grapheme);
    }
    out.push(ELLIPSIS);
    out
}

/// Truncate or right-pad `s` to exactly `cells` cells, for column layout
pub fn fit_to_width(s: &str, cells: usize) -> String {
    let mut out = truncate_to_width(s, cells);
    let width = display_width(&out);
    out.extend(std::iter::repeat_n(' ', cells.saturating_sub(width)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_wide_and_combining() {
        assert_eq!(display_width("Plan"), 4);
        assert_eq!(display_width("计划"), 4);
        assert_eq!(display_width("cafe\u{0301}"), 4);
    }

    #[test]
    fn truncate_leaves_short_text() {
        assert_eq!(truncate_to_width("Design", 6), "Design");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Print statement", 8), "Print s\u{2026}");
        assert_eq!(truncate_to_width("Print", 1), "\u{2026}");
        assert_eq!(truncate_to_width("Print", 0), "");
    }

    #[test]
    fn truncate_does_not_split_wide_chars() {
        assert_eq!(truncate_to_width("账户报表", 5), "账户\u{2026}");
        // A 3-cell budget fits one 2-cell char and leaves a gap
        assert_eq!(truncate_to_width("账户报表", 4), "账\u{2026}");
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit_to_width("Core", 6), "Core  ");
        assert_eq!(fit_to_width("Accounts", 5), "Acco\u{2026}");
        assert_eq!(display_width(&fit_to_width("账户", 5)), 5);
    }
}
