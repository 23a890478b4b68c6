use std::time::Instant;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::app::App;
use crate::controller::PopupController;
use crate::document::{Layer, LayerKind};
use crate::page::{LineKind, PAGE_MARGIN, PageLine};
use crate::theme::{POPUP_STYLE_ID, PopupStyle, Theme};

/// Below this progress the popup is not drawn at all (opacity ~0).
const HIDDEN_BELOW: f32 = 0.05;
/// Below this progress the popup is drawn dimmed, the terminal's stand-in
/// for partial opacity.
const DIM_BELOW: f32 = 0.6;
const BACKDROP_FULL_AT: f32 = 0.5;

/// Draws the page, then every overlay layer bottom-to-top.
pub fn render(f: &mut Frame, app: &App, now: Instant) {
    let area = f.area();
    f.render_widget(Block::default().style(Style::default().bg(app.theme.root_bg)), area);
    render_page(f, app, area);

    let scroll_y = app.document.viewport().scroll_y;
    for layer in app.document.layers().iter().filter(|layer| layer.visible) {
        let progress = layer.fade.progress(now);
        match layer.kind {
            LayerKind::Backdrop => render_backdrop(f, app, progress),
            LayerKind::Popup => {
                let Some(controller) = app.controller(layer.owner) else {
                    continue;
                };
                if controller.popup_node() != Some(layer.id) {
                    continue;
                }
                let style = controller.style(&app.document);
                render_popup(f, controller, layer, &style, progress, scroll_y);
            }
        }
    }
}

fn page_line<'a>(line: &'a PageLine, theme: &Theme) -> Line<'a> {
    let base = match line.kind {
        LineKind::Blank => Style::default(),
        LineKind::Title => theme.title,
        LineKind::Nav => Style::default().fg(theme.text_secondary),
        LineKind::Body => Style::default().fg(theme.text),
        LineKind::Footer => theme.footer,
    };
    let mut spans = vec![Span::raw(" ".repeat(PAGE_MARGIN as usize))];
    spans.extend(line.segments.iter().map(|segment| match segment.anchor {
        Some(_) => Span::styled(segment.text.as_str(), theme.link),
        None => Span::styled(segment.text.as_str(), base),
    }));
    Line::from(spans)
}

fn render_page(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .page
        .lines()
        .iter()
        .map(|line| page_line(line, &app.theme))
        .collect();
    let scroll_y = u16::try_from(app.document.viewport().scroll_y).unwrap_or(u16::MAX);
    f.render_widget(Paragraph::new(lines).scroll((scroll_y, 0)), area);
}

fn render_backdrop(f: &mut Frame, app: &App, progress: f32) {
    if progress <= 0.0 {
        return;
    }
    let dim = if progress >= BACKDROP_FULL_AT {
        app.document
            .style(POPUP_STYLE_ID)
            .map(|sheet| sheet.backdrop)
            .unwrap_or_else(|| Style::default().add_modifier(Modifier::DIM))
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let area = f.area();
    f.buffer_mut().set_style(area, dim);
}

/// Intersection of a viewport-space box with the frame, if any.
fn clip(area: Rect, left: i32, top: i32, width: i32, height: i32) -> Option<Rect> {
    let x0 = left.max(i32::from(area.x));
    let y0 = top.max(i32::from(area.y));
    let x1 = (left + width).min(i32::from(area.right()));
    let y1 = (top + height).min(i32::from(area.bottom()));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some(Rect::new(x0 as u16, y0 as u16, (x1 - x0) as u16, (y1 - y0) as u16))
}

fn put_line(buf: &mut Buffer, clip_area: Rect, x: i32, y: i32, line: &Line) {
    if x < i32::from(clip_area.x) || x >= i32::from(clip_area.right()) {
        return;
    }
    if y < i32::from(clip_area.y) || y >= i32::from(clip_area.bottom()) {
        return;
    }
    let max_width = clip_area.right() - x as u16;
    buf.set_line(x as u16, y as u16, line, max_width);
}

fn render_popup(
    f: &mut Frame,
    controller: &PopupController,
    layer: &Layer,
    style: &PopupStyle,
    progress: f32,
    scroll_y: i32,
) {
    let (Some(layout), Some(geometry)) = (controller.layout(), controller.geometry()) else {
        return;
    };
    if progress < HIDDEN_BELOW {
        return;
    }
    let area = f.area();
    // enters from slightly below, like a translateY transition
    let slide = ((1.0 - progress) * style.slide_rows as f32).round() as i32;
    let left = layer.bounds.left;
    let top = layer.bounds.top - scroll_y + slide;
    let Some(rect) = clip(area, left, top, layer.bounds.width, layer.bounds.height) else {
        return;
    };

    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(style.border)
        .style(Style::default().bg(style.background));
    f.render_widget(block, rect);

    let buf = f.buffer_mut();
    for row in &layout.rows {
        let value_style = match row.href {
            Some(_) => style.link.add_modifier(Modifier::UNDERLINED),
            None => style.value,
        };
        let line = Line::from(vec![
            Span::styled(row.label.as_str(), style.label),
            Span::styled(row.colon.as_str(), style.colon),
            Span::styled(row.value.as_str(), value_style),
        ]);
        put_line(buf, rect, left + row.x, top + row.y, &line);
    }

    if let Some(offset) = geometry.triangle_offset {
        let x = left + offset + style.triangle_rules.width / 2;
        let (y, glyph) = if geometry.flipped {
            (top + layer.bounds.height, "▼")
        } else {
            (top - 1, "▲")
        };
        if clip(area, x, y, 1, 1).is_some() {
            buf.set_string(x as u16, y as u16, glyph, style.triangle);
        }
    }

    if progress < DIM_BELOW {
        buf.set_style(rect, Style::default().add_modifier(Modifier::DIM));
    }
}
