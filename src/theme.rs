use ratatui::style::{Color, Modifier, Style};

use crate::placement::TriangleRules;

/// Id the popup style sheet is registered under in the document.
pub const POPUP_STYLE_ID: &str = "contact-popup-style";

/// Colors of the page the popups sit on.
pub struct Theme {
    pub root_bg: Color,
    pub text: Color,
    pub text_secondary: Color,
    pub title: Style,
    pub link: Style,
    pub footer: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            root_bg: Color::Black,
            text: Color::White,
            text_secondary: Color::Gray,
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            link: Style::default()
                .fg(Color::Rgb(120, 160, 230))
                .add_modifier(Modifier::UNDERLINED),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        }
    }
}

/// Visual rules for one popup box at one viewport class.
#[derive(Clone, Debug, PartialEq)]
pub struct PopupStyle {
    pub background: Color,
    pub border: Style,
    pub label: Style,
    pub colon: Style,
    pub value: Style,
    pub link: Style,
    pub triangle: Style,
    pub padding_left: i32,
    pub padding_right: i32,
    pub padding_top: i32,
    pub padding_bottom: i32,
    /// Minimum width of the label column; longer labels widen it.
    pub label_min_width: i32,
    /// Width of the right-aligned colon column.
    pub colon_width: i32,
    /// Lower bound of the box width, border included.
    pub min_width: i32,
    /// Upper bound of the box width as a share of the viewport.
    pub max_width_percent: i32,
    /// Rows the box slides up by while it fades in.
    pub slide_rows: i32,
    pub triangle_rules: TriangleRules,
}

impl PopupStyle {
    fn base() -> Self {
        let accent = Color::Rgb(42, 77, 143);
        Self {
            background: Color::Rgb(250, 250, 252),
            border: Style::default().fg(Color::Rgb(180, 190, 210)),
            label: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            colon: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            value: Style::default().fg(Color::Rgb(51, 51, 51)),
            link: Style::default().fg(accent),
            triangle: Style::default().fg(Color::Rgb(250, 250, 252)),
            padding_left: 3,
            padding_right: 3,
            padding_top: 1,
            padding_bottom: 0,
            label_min_width: 12,
            colon_width: 2,
            min_width: 36,
            max_width_percent: 90,
            slide_rows: 1,
            triangle_rules: TriangleRules {
                width: 2,
                min_offset: 2,
                max_inset: 4,
            },
        }
    }

    fn narrow() -> Self {
        Self {
            padding_left: 1,
            padding_right: 1,
            padding_top: 0,
            label_min_width: 8,
            min_width: 0,
            triangle_rules: TriangleRules {
                width: 2,
                min_offset: 1,
                max_inset: 3,
            },
            ..Self::base()
        }
    }
}

/// The popup style sheet: a base style plus a narrow-viewport override.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleSheet {
    pub base: PopupStyle,
    pub narrow: PopupStyle,
    /// Viewports at most this wide use `narrow`.
    pub breakpoint: i32,
    /// Dimming applied to the page under a backdrop.
    pub backdrop: Style,
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self {
            base: PopupStyle::base(),
            narrow: PopupStyle::narrow(),
            breakpoint: 60,
            backdrop: Style::default()
                .bg(Color::Rgb(20, 20, 24))
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
        }
    }
}

impl StyleSheet {
    pub fn resolve(&self, viewport_width: i32) -> &PopupStyle {
        if viewport_width <= self.breakpoint {
            &self.narrow
        } else {
            &self.base
        }
    }
}
