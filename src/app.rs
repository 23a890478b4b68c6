use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Settings;
use crate::controller::PopupController;
use crate::document::{Document, HitTarget, ListenerKind, OwnerId};
use crate::page::Page;
use crate::theme::Theme;

/// Poll interval while nothing is scheduled or animating.
const IDLE_POLL: Duration = Duration::from_millis(200);
/// Poll interval while a transition is running.
const FRAME_POLL: Duration = Duration::from_millis(16);

#[derive(Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Opened(OwnerId),
    Link(String),
    Nothing,
}

/// The last press, kept until its release.
#[derive(Debug)]
struct Press {
    target: HitTarget,
    /// Popups the press closed through their capture listeners.
    closed: Vec<OwnerId>,
}

pub struct App {
    pub document: Document,
    pub page: Page,
    pub controllers: Vec<PopupController>,
    pub theme: Theme,
    press: Option<Press>,
}

impl App {
    pub fn new(settings: &Settings, width: i32, height: i32) -> Self {
        let mut document = Document::new(width, height);
        let links: Vec<(String, String)> = settings
            .popups
            .iter()
            .map(|popup| (popup.anchor.clone(), popup.label.clone()))
            .collect();
        let page = Page::new(&settings.page, &links);
        page.register(&mut document);

        let controllers = settings
            .popups
            .iter()
            .enumerate()
            .map(|(i, popup)| {
                PopupController::new(
                    OwnerId(i as u32 + 1),
                    popup.anchor.clone(),
                    popup.variant,
                    popup.template(),
                    settings.placement,
                    settings.timing,
                    &mut document,
                )
            })
            .collect::<Vec<_>>();
        info!(popups = controllers.len(), width, height, "page ready");

        Self {
            document,
            page,
            controllers,
            theme: Theme::default(),
            press: None,
        }
    }

    pub fn controller(&self, owner: OwnerId) -> Option<&PopupController> {
        self.controllers.iter().find(|controller| controller.owner() == owner)
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.document.resize(width, height);
        for controller in &mut self.controllers {
            controller.reflow(&mut self.document);
        }
    }

    /// A press: capture listeners see it first. Returns how many popups it
    /// closed.
    pub fn pointer_down(&mut self, x: i32, y: i32, kind: ListenerKind, now: Instant) -> usize {
        let target = self.document.hit_test(x, y);
        let owners = self.document.listener_owners(kind);
        let mut closed = Vec::new();
        for owner in owners {
            if let Some(controller) = self.controllers.iter_mut().find(|controller| controller.owner() == owner)
                && controller.handle_capture(&mut self.document, kind, &target, now)
            {
                closed.push(owner);
            }
        }
        let count = closed.len();
        self.press = Some(Press { target, closed });
        count
    }

    /// A release: it is a click only when it lands on the element the press
    /// started on. Opens the popup of a clicked anchor, or reports a link
    /// clicked inside a popup. A release with no recorded press (a
    /// synthesized click) is taken as is.
    pub fn click(&mut self, x: i32, y: i32, now: Instant) -> ClickOutcome {
        let target = self.document.hit_test(x, y);
        let press = self.press.take();
        if let Some(press) = &press
            && !press.target.same_element(&target)
        {
            debug!(pressed = ?press.target, released = ?target, "press and release on different elements");
            return ClickOutcome::Nothing;
        }
        match &target {
            HitTarget::Anchor(anchor) => {
                let Some(controller) = self
                    .controllers
                    .iter_mut()
                    .find(|controller| controller.anchor_id() == anchor.as_str())
                else {
                    debug!(%anchor, "click on anchor without popup");
                    return ClickOutcome::Nothing;
                };
                // the press on the link already closed this popup
                if press.is_some_and(|press| press.closed.contains(&controller.owner())) {
                    debug!(%anchor, "click closed its own popup");
                    return ClickOutcome::Nothing;
                }
                if controller.open(&mut self.document, now) {
                    ClickOutcome::Opened(controller.owner())
                } else {
                    ClickOutcome::Nothing
                }
            }
            HitTarget::Layer { owner, .. } => self
                .controller(*owner)
                .and_then(|controller| controller.link_at(&target))
                .map(ClickOutcome::Link)
                .unwrap_or(ClickOutcome::Nothing),
            HitTarget::Page => ClickOutcome::Nothing,
        }
    }

    pub fn scroll(&mut self, dy: i32) -> bool {
        self.document.scroll_by(dy)
    }

    pub fn tick(&mut self, now: Instant) {
        for controller in &mut self.controllers {
            controller.tick(&mut self.document, now);
        }
    }

    /// How long the event loop may block before something needs a redraw.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        let mut timeout = if self.document.is_animating(now) {
            FRAME_POLL
        } else {
            IDLE_POLL
        };
        if let Some(deadline) = self.controllers.iter().filter_map(PopupController::next_deadline).min() {
            timeout = timeout.min(deadline.saturating_duration_since(now));
        }
        timeout
    }
}
