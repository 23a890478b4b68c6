use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const ELLIPSIS: char = '…';

/// Terminal column width of `text`.
pub fn display_width(text: &str) -> i32 {
    UnicodeWidthStr::width(text) as i32
}

/// Cuts `text` to at most `max_width` columns, ending in an ellipsis when
/// anything was dropped. Wide characters are never split.
pub fn truncate_with_ellipsis(text: &str, max_width: i32) -> String {
    if max_width <= 0 {
        return String::new();
    }
    if display_width(text) <= max_width {
        return text.to_string();
    }
    let budget = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0) as i32;
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push(ELLIPSIS);
    out
}

/// Left-aligns `text` in a column of `width`.
pub fn pad_right(text: &str, width: i32) -> String {
    let fill = (width - display_width(text)).max(0) as usize;
    format!("{}{}", text, " ".repeat(fill))
}

/// Right-aligns `text` in a column of `width`.
pub fn pad_left(text: &str, width: i32) -> String {
    let fill = (width - display_width(text)).max(0) as usize;
    format!("{}{}", " ".repeat(fill), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_ellipsis("XXXX", 10), "XXXX");
    }

    #[test]
    fn long_text_ends_in_ellipsis() {
        let cut = truncate_with_ellipsis("breakaway@support.com", 10);
        assert_eq!(cut, "breakaway…");
        assert_eq!(display_width(&cut), 10);
    }

    #[test]
    fn wide_characters_are_not_split() {
        // each CJK char is two columns wide
        let cut = truncate_with_ellipsis("微信公众号", 6);
        assert_eq!(cut, "微信…");
        assert!(display_width(&cut) <= 6);
    }

    #[test]
    fn padding_uses_display_width() {
        assert_eq!(pad_right("邮箱", 6), "邮箱  ");
        assert_eq!(pad_left("：", 3), " ：");
    }
}
