//! Declarative popup content: what rows the box holds, kept apart from how
//! the controller shows, hides and positions it.

use crate::models::{ContactRow, ContactValue};
use crate::placement::Size;
use crate::theme::PopupStyle;
use crate::utils::{display_width, pad_left, pad_right, truncate_with_ellipsis};

const BORDER: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupTemplate {
    rows: Vec<ContactRow>,
    colon: String,
}

#[derive(Debug, Default)]
pub struct PopupTemplateBuilder {
    rows: Vec<ContactRow>,
    colon: Option<String>,
}

impl PopupTemplateBuilder {
    pub fn text_row(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.rows.push(ContactRow {
            label: label.into(),
            value: ContactValue::Text(value.into()),
        });
        self
    }

    pub fn link_row(
        mut self,
        label: impl Into<String>,
        text: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        self.rows.push(ContactRow {
            label: label.into(),
            value: ContactValue::Link {
                text: text.into(),
                href: href.into(),
            },
        });
        self
    }

    pub fn colon(mut self, colon: impl Into<String>) -> Self {
        self.colon = Some(colon.into());
        self
    }

    pub fn build(self) -> PopupTemplate {
        PopupTemplate {
            rows: self.rows,
            colon: self.colon.unwrap_or_else(|| ":".to_string()),
        }
    }
}

/// One laid-out row, in box-local coordinates (border included).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowLayout {
    pub y: i32,
    pub x: i32,
    pub label: String,
    pub colon: String,
    pub value: String,
    pub value_x: i32,
    pub href: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupLayout {
    pub size: Size,
    pub rows: Vec<RowLayout>,
}

impl PopupLayout {
    /// Row under a box-local point, if any.
    pub fn row_at(&self, x: i32, y: i32) -> Option<&RowLayout> {
        if x < BORDER || x >= self.size.width - BORDER {
            return None;
        }
        self.rows.iter().find(|row| row.y == y)
    }
}

impl PopupTemplate {
    pub fn builder() -> PopupTemplateBuilder {
        PopupTemplateBuilder::default()
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[ContactRow] {
        &self.rows
    }

    /// Lays the rows out the way the box would size itself: natural width
    /// from its widest row, bounded by the style's min width and by a share
    /// of the viewport. Values that no longer fit are cut with an ellipsis.
    pub fn layout(&self, style: &PopupStyle, viewport_width: i32) -> PopupLayout {
        let label_col = self
            .rows
            .iter()
            .map(|row| display_width(&row.label))
            .fold(style.label_min_width, i32::max);
        let colon_col = style.colon_width.max(display_width(&self.colon));
        let widest_value = self
            .rows
            .iter()
            .map(|row| display_width(row.value.text()))
            .max()
            .unwrap_or(0);

        let chrome = 2 * BORDER + style.padding_left + style.padding_right;
        let natural = chrome + label_col + colon_col + widest_value;
        let max_width = (viewport_width * style.max_width_percent / 100).max(1);
        // min-width beats max-width, as in CSS
        let width = natural.min(max_width).max(style.min_width);
        let value_room = (width - chrome - label_col - colon_col).max(0);

        let x = BORDER + style.padding_left;
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| RowLayout {
                y: BORDER + style.padding_top + i as i32,
                x,
                label: pad_right(&row.label, label_col),
                colon: pad_left(&self.colon, colon_col),
                value: truncate_with_ellipsis(row.value.text(), value_room),
                value_x: x + label_col + colon_col,
                href: row.value.href().map(str::to_string),
            })
            .collect();

        let height = 2 * BORDER + style.padding_top + style.padding_bottom + self.rows.len() as i32;
        PopupLayout {
            size: Size::new(width, height),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::StyleSheet;
    use crate::utils::ELLIPSIS;

    fn template() -> PopupTemplate {
        PopupTemplate::builder()
            .link_row("Email", "breakaway@support.com", "mailto:breakaway@support.com")
            .text_row("WeChat account", "XXXX")
            .colon("：")
            .build()
    }

    #[test]
    fn colons_line_up_across_rows() {
        let sheet = StyleSheet::default();
        let layout = template().layout(&sheet.base, 120);
        let colon_columns: Vec<i32> = layout
            .rows
            .iter()
            .map(|row| row.x + display_width(&row.label))
            .collect();
        assert_eq!(colon_columns[0], colon_columns[1]);
        assert_eq!(layout.rows[0].value_x, layout.rows[1].value_x);
    }

    #[test]
    fn label_column_grows_past_min_width() {
        let sheet = StyleSheet::default();
        let layout = template().layout(&sheet.base, 120);
        // "WeChat account" is wider than the 12-column minimum
        assert_eq!(display_width(&layout.rows[0].label), 14);
    }

    #[test]
    fn natural_width_respects_min_width() {
        let sheet = StyleSheet::default();
        let tiny = PopupTemplate::builder().text_row("a", "b").build();
        let layout = tiny.layout(&sheet.base, 120);
        assert_eq!(layout.size.width, sheet.base.min_width);
        assert_eq!(layout.size.height, 2 + sheet.base.padding_top + 1);
    }

    #[test]
    fn overflowing_values_are_truncated() {
        let sheet = StyleSheet::default();
        let layout = template().layout(&sheet.narrow, 30);
        assert_eq!(layout.size.width, 27);
        let email = &layout.rows[0];
        assert!(email.value.ends_with(ELLIPSIS));
        assert!(email.value_x + display_width(&email.value) <= layout.size.width - 1 - sheet.narrow.padding_right);
        assert_eq!(layout.rows[1].value, "XXXX");
    }

    #[test]
    fn link_rows_keep_their_target() {
        let sheet = StyleSheet::default();
        let layout = template().layout(&sheet.base, 120);
        assert_eq!(layout.rows[0].href.as_deref(), Some("mailto:breakaway@support.com"));
        assert_eq!(layout.rows[1].href, None);
        let first = &layout.rows[0];
        assert_eq!(layout.row_at(first.value_x, first.y), Some(first));
        assert_eq!(layout.row_at(0, first.y), None);
    }
}
