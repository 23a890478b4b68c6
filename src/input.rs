use std::io;
use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tracing::{debug, info, warn};

use crate::app::{App, ClickOutcome};
use crate::document::ListenerKind;

/// Rows moved per arrow key or wheel notch.
const LINE_STEP: i32 = 1;
const WHEEL_STEP: i32 = 3;

/// Feeds one terminal event to the app. Returns false when the user asked
/// to quit. `open_link` is called with the target of a clicked popup link.
pub fn handle_event<F>(app: &mut App, event: Event, now: Instant, open_link: &mut F) -> bool
where
    F: FnMut(&str) -> io::Result<()>,
{
    match event {
        Event::Key(key) => handle_key(app, key),
        Event::Mouse(mouse) => {
            handle_mouse(app, mouse, now, open_link);
            true
        }
        Event::Resize(width, height) => {
            debug!(width, height, "terminal resized");
            app.resize(i32::from(width), i32::from(height));
            true
        }
        _ => true,
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return true;
    }
    let page = (app.document.viewport().height - 1).max(1);
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
        KeyCode::Up | KeyCode::Char('k') => {
            app.scroll(-LINE_STEP);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.scroll(LINE_STEP);
        }
        KeyCode::PageUp => {
            app.scroll(-page);
        }
        KeyCode::PageDown | KeyCode::Char(' ') => {
            app.scroll(page);
        }
        _ => {}
    }
    true
}

fn handle_mouse<F>(app: &mut App, mouse: MouseEvent, now: Instant, open_link: &mut F)
where
    F: FnMut(&str) -> io::Result<()>,
{
    let x = i32::from(mouse.column);
    let y = i32::from(mouse.row);
    match mouse.kind {
        // crossterm reports no touch input, so only PointerDown listeners
        // ever fire from here; TouchStart ones stay registered for hosts
        // that have it.
        MouseEventKind::Down(MouseButton::Left) => {
            let closed = app.pointer_down(x, y, ListenerKind::PointerDown, now);
            if closed > 0 {
                debug!(x, y, closed, "press closed popups");
            }
        }
        MouseEventKind::Up(MouseButton::Left) => match app.click(x, y, now) {
            ClickOutcome::Opened(owner) => debug!(?owner, "popup opened"),
            ClickOutcome::Link(href) => {
                info!(%href, "opening link");
                if let Err(err) = open_link(&href) {
                    warn!(%href, %err, "could not open link");
                }
            }
            ClickOutcome::Nothing => {}
        },
        MouseEventKind::ScrollUp => {
            app.scroll(-WHEEL_STEP);
        }
        MouseEventKind::ScrollDown => {
            app.scroll(WHEEL_STEP);
        }
        _ => {}
    }
}
