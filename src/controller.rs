//! Popup lifecycle: Closed → Opening → Open → Closing → Closed.
//!
//! The staged parts of showing and hiding (attach listeners a moment after
//! insertion, activate on the next tick, remove once the exit transition has
//! played) are pending steps with due instants instead of timers. The event
//! loop calls [`PopupController::tick`] and sizes its poll timeout from
//! [`PopupController::next_deadline`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{Fade, TimeFunction};
use crate::document::{Document, HitTarget, LayerKind, ListenerId, ListenerKind, NodeId, OwnerId};
use crate::models::{PopupState, Variant};
use crate::placement::{self, Bounds, PlacementRules, PopupGeometry};
use crate::template::{PopupLayout, PopupTemplate};
use crate::theme::{POPUP_STYLE_ID, PopupStyle, StyleSheet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timing {
    /// Delay before outside-press listeners go live, so the press that
    /// opened the popup is not taken as an outside press.
    pub listener_delay_ms: u64,
    /// Delay between insertion and activation, so the hidden state is drawn
    /// once before the entrance transition starts.
    pub activate_delay_ms: u64,
    /// Delay between close and removal; covers the exit transition.
    pub removal_delay_ms: u64,
    pub transition_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            listener_delay_ms: 20,
            activate_delay_ms: 10,
            removal_delay_ms: 300,
            transition_ms: 280,
        }
    }
}

impl Timing {
    fn listener_delay(&self) -> Duration {
        Duration::from_millis(self.listener_delay_ms)
    }

    fn activate_delay(&self) -> Duration {
        Duration::from_millis(self.activate_delay_ms)
    }

    fn removal_delay(&self) -> Duration {
        Duration::from_millis(self.removal_delay_ms)
    }

    fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    AttachListeners,
    Activate,
    Remove,
}

#[derive(Debug)]
struct Instance {
    popup: NodeId,
    backdrop: Option<NodeId>,
    layout: PopupLayout,
    geometry: PopupGeometry,
    listeners: Vec<ListenerId>,
}

pub struct PopupController {
    owner: OwnerId,
    anchor_id: String,
    variant: Variant,
    template: PopupTemplate,
    rules: PlacementRules,
    timing: Timing,
    state: PopupState,
    instance: Option<Instance>,
    pending: Vec<(Instant, Step)>,
}

impl PopupController {
    /// Creates the controller and makes sure the popup style sheet is in the
    /// document.
    pub fn new(
        owner: OwnerId,
        anchor_id: impl Into<String>,
        variant: Variant,
        template: PopupTemplate,
        rules: PlacementRules,
        timing: Timing,
        doc: &mut Document,
    ) -> Self {
        doc.inject_style(POPUP_STYLE_ID, StyleSheet::default());
        Self {
            owner,
            anchor_id: anchor_id.into(),
            variant,
            template,
            rules,
            timing,
            state: PopupState::Closed,
            instance: None,
            pending: Vec::new(),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn anchor_id(&self) -> &str {
        &self.anchor_id
    }

    #[cfg(test)]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn popup_node(&self) -> Option<NodeId> {
        self.instance.as_ref().map(|instance| instance.popup)
    }

    pub fn backdrop_node(&self) -> Option<NodeId> {
        self.instance.as_ref().and_then(|instance| instance.backdrop)
    }

    pub fn layout(&self) -> Option<&PopupLayout> {
        self.instance.as_ref().map(|instance| &instance.layout)
    }

    pub fn geometry(&self) -> Option<&PopupGeometry> {
        self.instance.as_ref().map(|instance| &instance.geometry)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(due, _)| *due).min()
    }

    fn can_open(&self) -> bool {
        !self.state.is_live()
    }

    fn can_close(&self) -> bool {
        self.state.is_live()
    }

    /// Resolves the style sheet for the current viewport width.
    pub fn style(&self, doc: &Document) -> PopupStyle {
        let width = doc.viewport().width;
        match doc.style(POPUP_STYLE_ID) {
            Some(sheet) => sheet.resolve(width).clone(),
            None => StyleSheet::default().resolve(width).clone(),
        }
    }

    /// Opens the popup under its anchor. Returns whether a new instance was
    /// built; an open that is already live, or whose anchor is missing, does
    /// nothing.
    pub fn open(&mut self, doc: &mut Document, now: Instant) -> bool {
        if !self.can_open() {
            debug!(anchor = %self.anchor_id, state = ?self.state, "open ignored, popup already live");
            return false;
        }
        let Some(anchor) = doc.anchor_rect(&self.anchor_id) else {
            debug!(anchor = %self.anchor_id, "open ignored, anchor not found");
            return false;
        };
        if self.state == PopupState::Closing {
            self.retire(doc);
        }

        let viewport = doc.viewport();
        let fade = Fade::new(self.timing.transition(), TimeFunction::STANDARD);

        let backdrop = self.variant.has_backdrop().then(|| {
            let full = Bounds::new(viewport.scroll_x, viewport.scroll_y, viewport.width, viewport.height);
            let dim = Fade::new(self.timing.transition(), TimeFunction::Linear);
            let id = doc.insert_layer(self.owner, LayerKind::Backdrop, full, dim);
            if let Some(layer) = doc.layer_mut(id) {
                layer.visible = true;
            }
            id
        });

        // insert hidden at the tentative spot, measure, then finalize
        let (top, left) = placement::tentative_position(anchor, &viewport, &self.rules);
        let style = self.style(doc);
        let layout = self.template.layout(&style, viewport.width);
        let popup = doc.insert_layer(
            self.owner,
            LayerKind::Popup,
            Bounds::new(left, top, layout.size.width, layout.size.height),
            fade,
        );
        let triangle = self.variant.has_backdrop().then_some(&style.triangle_rules);
        let geometry = placement::place(anchor, layout.size, &viewport, &self.rules, triangle);
        if let Some(layer) = doc.layer_mut(popup) {
            layer.bounds = geometry.bounds();
            layer.visible = true;
        }

        doc.lock_scroll(self.owner);
        self.instance = Some(Instance {
            popup,
            backdrop,
            layout,
            geometry,
            listeners: Vec::new(),
        });
        self.schedule(now + self.timing.activate_delay(), Step::Activate);
        self.schedule(now + self.timing.listener_delay(), Step::AttachListeners);
        self.state = PopupState::Opening;
        debug!(anchor = %self.anchor_id, popup, ?geometry, "popup opening");
        true
    }

    /// Starts the exit transition. Scrolling is unlocked and listeners are
    /// dropped right away; the layers go once the removal delay has passed.
    pub fn close(&mut self, doc: &mut Document, now: Instant) -> bool {
        if !self.can_close() {
            debug!(anchor = %self.anchor_id, state = ?self.state, "close ignored, popup not live");
            return false;
        }
        let Some(instance) = self.instance.as_mut() else {
            self.state = PopupState::Closed;
            return false;
        };

        for id in [Some(instance.popup), instance.backdrop].into_iter().flatten() {
            if let Some(layer) = doc.layer_mut(id) {
                layer.fade.set_active(false, now);
            }
        }
        doc.unlock_scroll(self.owner);
        for listener in instance.listeners.drain(..) {
            doc.remove_listener(listener);
        }

        // a close inside the open delays also cancels the attach/activate steps
        self.pending.clear();
        self.schedule(now + self.timing.removal_delay(), Step::Remove);
        self.state = PopupState::Closing;
        debug!(anchor = %self.anchor_id, "popup closing");
        true
    }

    /// Outside-press handling for a capture listener of this controller.
    /// Returns whether the press closed the popup.
    pub fn handle_capture(&mut self, doc: &mut Document, kind: ListenerKind, target: &HitTarget, now: Instant) -> bool {
        let Some(instance) = self.instance.as_ref() else {
            return false;
        };
        if !self.state.is_live() || instance.listeners.is_empty() {
            return false;
        }
        let outside = match self.variant {
            Variant::Plain => !target.is_within(instance.popup),
            Variant::Backdrop => instance.backdrop.is_some_and(|backdrop| target.is_within(backdrop)),
        };
        if !outside {
            return false;
        }
        debug!(anchor = %self.anchor_id, ?kind, "outside press");
        self.close(doc, now)
    }

    /// Link target of the popup row under `target`, if the press landed on
    /// a link value.
    pub fn link_at(&self, target: &HitTarget) -> Option<String> {
        let instance = self.instance.as_ref()?;
        let HitTarget::Layer { id, local_x, local_y, .. } = target else {
            return None;
        };
        if *id != instance.popup {
            return None;
        }
        let row = instance.layout.row_at(*local_x, *local_y)?;
        if *local_x < row.value_x {
            return None;
        }
        row.href.clone()
    }

    /// Runs every step that is due at `now`, earliest first.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) {
        while let Some(index) = self.next_due(now) {
            let (_, step) = self.pending.remove(index);
            self.run(step, doc, now);
        }
    }

    /// Lays the live popup out again, e.g. after the viewport changed size.
    pub fn reflow(&mut self, doc: &mut Document) {
        if !self.state.is_live() {
            return;
        }
        self.settle(doc);
        let viewport = doc.viewport();
        if let Some(backdrop) = self.backdrop_node()
            && let Some(layer) = doc.layer_mut(backdrop)
        {
            layer.bounds = Bounds::new(viewport.scroll_x, viewport.scroll_y, viewport.width, viewport.height);
        }
    }

    fn schedule(&mut self, due: Instant, step: Step) {
        self.pending.push((due, step));
    }

    fn next_due(&self, now: Instant) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, (due, _))| *due <= now)
            .min_by_key(|(_, (due, _))| *due)
            .map(|(index, _)| index)
    }

    fn run(&mut self, step: Step, doc: &mut Document, now: Instant) {
        match step {
            Step::Activate => {
                if self.state != PopupState::Opening {
                    return;
                }
                // layout can move slightly once the box is in the document
                self.settle(doc);
                if let Some(instance) = self.instance.as_ref() {
                    for id in [Some(instance.popup), instance.backdrop].into_iter().flatten() {
                        if let Some(layer) = doc.layer_mut(id) {
                            layer.fade.set_active(true, now);
                        }
                    }
                }
                self.state = PopupState::Open;
                debug!(anchor = %self.anchor_id, "popup open");
            }
            Step::AttachListeners => {
                if !self.state.is_live() {
                    return;
                }
                if let Some(instance) = self.instance.as_mut()
                    && instance.listeners.is_empty()
                {
                    instance.listeners.push(doc.add_listener(self.owner, ListenerKind::PointerDown));
                    instance.listeners.push(doc.add_listener(self.owner, ListenerKind::TouchStart));
                }
            }
            Step::Remove => {
                if self.state != PopupState::Closing {
                    return;
                }
                self.teardown(doc);
                debug!(anchor = %self.anchor_id, "popup removed");
            }
        }
    }

    /// Recomputes layout and geometry for the live instance.
    fn settle(&mut self, doc: &mut Document) {
        let Some(anchor) = doc.anchor_rect(&self.anchor_id) else {
            return;
        };
        let viewport = doc.viewport();
        let style = self.style(doc);
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        let layout = self.template.layout(&style, viewport.width);
        let triangle = self.variant.has_backdrop().then_some(&style.triangle_rules);
        let geometry = placement::place(anchor, layout.size, &viewport, &self.rules, triangle);
        if geometry != instance.geometry {
            debug!(anchor = %self.anchor_id, ?geometry, "popup geometry corrected");
        }
        if let Some(layer) = doc.layer_mut(instance.popup) {
            layer.bounds = geometry.bounds();
        }
        instance.layout = layout;
        instance.geometry = geometry;
    }

    /// Drops a closing instance right away so a new open can build afresh.
    fn retire(&mut self, doc: &mut Document) {
        self.pending.retain(|(_, step)| *step != Step::Remove);
        self.teardown(doc);
        debug!(anchor = %self.anchor_id, "closing popup preempted by open");
    }

    fn teardown(&mut self, doc: &mut Document) {
        if let Some(mut instance) = self.instance.take() {
            doc.remove_layer(instance.popup);
            if let Some(backdrop) = instance.backdrop {
                doc.remove_layer(backdrop);
            }
            for listener in instance.listeners.drain(..) {
                doc.remove_listener(listener);
            }
        }
        doc.unlock_scroll(self.owner);
        self.state = PopupState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: OwnerId = OwnerId(1);
    const ANCHOR: &str = "contact-link";

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn template() -> PopupTemplate {
        PopupTemplate::builder()
            .link_row("Email", "breakaway@support.com", "mailto:breakaway@support.com")
            .text_row("WeChat", "XXXX")
            .build()
    }

    fn terminal_rules() -> PlacementRules {
        PlacementRules {
            gap: 1,
            edge_margin: 2,
            min_margin: 1,
        }
    }

    fn setup(variant: Variant) -> (Document, PopupController) {
        let mut doc = Document::new(120, 40);
        doc.set_content_height(100);
        doc.set_anchor(ANCHOR, Bounds::new(10, 2, 10, 1));
        let controller = PopupController::new(
            OWNER,
            ANCHOR,
            variant,
            template(),
            terminal_rules(),
            Timing::default(),
            &mut doc,
        );
        (doc, controller)
    }

    fn popups(doc: &Document) -> usize {
        doc.count_layers(OWNER, LayerKind::Popup)
    }

    /// Opens and runs every opening step.
    fn open_settled(doc: &mut Document, controller: &mut PopupController, now: Instant) {
        assert!(controller.open(doc, now));
        controller.tick(doc, now + ms(20));
        assert_eq!(controller.state(), PopupState::Open);
    }

    #[test]
    fn open_builds_hidden_popup_below_anchor_and_locks_scroll() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        assert!(controller.open(&mut doc, now));

        assert_eq!(controller.state(), PopupState::Opening);
        assert_eq!(popups(&doc), 1);
        assert!(doc.is_scroll_locked());
        let popup = doc.layer(controller.popup_node().unwrap()).unwrap();
        assert!(popup.visible);
        assert!(!popup.fade.is_active());
        assert_eq!(popup.bounds.top, 4);
        assert_eq!(popup.bounds.left, 10);
        assert_eq!(controller.geometry().unwrap().triangle_offset, None);
    }

    #[test]
    fn activation_comes_before_listeners() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        controller.open(&mut doc, now);
        assert_eq!(controller.next_deadline(), Some(now + ms(10)));

        controller.tick(&mut doc, now + ms(10));
        assert_eq!(controller.state(), PopupState::Open);
        assert!(doc.layer(controller.popup_node().unwrap()).unwrap().fade.is_active());
        assert_eq!(doc.listener_count(OWNER), 0);

        controller.tick(&mut doc, now + ms(20));
        assert_eq!(doc.listener_count(OWNER), 2);
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn reopening_keeps_node_identity() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        controller.open(&mut doc, now);
        let first = controller.popup_node();
        assert!(!controller.open(&mut doc, now + ms(5)));
        controller.tick(&mut doc, now + ms(20));
        assert!(!controller.open(&mut doc, now + ms(30)));
        assert_eq!(controller.popup_node(), first);
        assert_eq!(popups(&doc), 1);
    }

    #[test]
    fn closing_when_closed_is_harmless() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        assert!(!controller.close(&mut doc, now));

        open_settled(&mut doc, &mut controller, now);
        assert!(controller.close(&mut doc, now + ms(50)));
        assert!(!controller.close(&mut doc, now + ms(60)));
        controller.tick(&mut doc, now + ms(400));
        assert!(!controller.close(&mut doc, now + ms(500)));
        assert_eq!(doc.listener_count(OWNER), 0);
    }

    #[test]
    fn scroll_unlocks_at_once_but_removal_waits_for_transition() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        open_settled(&mut doc, &mut controller, now);

        let closed_at = now + ms(100);
        controller.close(&mut doc, closed_at);
        assert!(!doc.is_scroll_locked());
        assert_eq!(doc.listener_count(OWNER), 0);
        assert_eq!(controller.state(), PopupState::Closing);

        controller.tick(&mut doc, closed_at + ms(299));
        assert_eq!(popups(&doc), 1);

        controller.tick(&mut doc, closed_at + ms(300));
        assert_eq!(popups(&doc), 0);
        assert_eq!(controller.state(), PopupState::Closed);
        assert_eq!(controller.popup_node(), None);
    }

    #[test]
    fn close_before_listener_delay_leaves_no_listeners() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        controller.open(&mut doc, now);
        controller.tick(&mut doc, now + ms(10));
        controller.close(&mut doc, now + ms(15));
        controller.tick(&mut doc, now + ms(25));
        assert_eq!(doc.listener_count(OWNER), 0);
        controller.tick(&mut doc, now + ms(400));
        assert_eq!(doc.listener_count(OWNER), 0);
        assert_eq!(popups(&doc), 0);
    }

    #[test]
    fn plain_variant_closes_on_any_press_outside_the_popup() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        open_settled(&mut doc, &mut controller, now);

        let inside = doc.hit_test(15, 6);
        assert!(inside.is_within(controller.popup_node().unwrap()));
        assert!(!controller.handle_capture(&mut doc, ListenerKind::PointerDown, &inside, now + ms(30)));
        assert_eq!(controller.state(), PopupState::Open);

        let anchor = doc.hit_test(12, 2);
        assert_eq!(anchor, HitTarget::Anchor(ANCHOR.to_string()));
        assert!(controller.handle_capture(&mut doc, ListenerKind::TouchStart, &anchor, now + ms(40)));
        assert_eq!(controller.state(), PopupState::Closing);
    }

    #[test]
    fn backdrop_variant_closes_only_on_backdrop_presses() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Backdrop);
        open_settled(&mut doc, &mut controller, now);
        assert_eq!(doc.count_layers(OWNER, LayerKind::Backdrop), 1);
        assert!(controller.geometry().unwrap().triangle_offset.is_some());

        let inside = doc.hit_test(15, 6);
        assert!(!controller.handle_capture(&mut doc, ListenerKind::PointerDown, &inside, now + ms(30)));
        assert!(!controller.handle_capture(&mut doc, ListenerKind::PointerDown, &HitTarget::Page, now + ms(30)));
        assert_eq!(controller.state(), PopupState::Open);

        let far = doc.hit_test(100, 30);
        assert!(far.is_within(controller.backdrop_node().unwrap()));
        assert!(controller.handle_capture(&mut doc, ListenerKind::PointerDown, &far, now + ms(40)));
        controller.tick(&mut doc, now + ms(400));
        assert_eq!(doc.count_layers(OWNER, LayerKind::Backdrop), 0);
    }

    #[test]
    fn presses_before_listeners_attach_are_ignored() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        controller.open(&mut doc, now);
        controller.tick(&mut doc, now + ms(10));
        assert!(!controller.handle_capture(&mut doc, ListenerKind::PointerDown, &HitTarget::Page, now + ms(12)));
        assert_eq!(controller.state(), PopupState::Open);
    }

    #[test]
    fn open_during_close_delay_rebuilds_and_cancels_removal() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Backdrop);
        open_settled(&mut doc, &mut controller, now);
        let old = controller.popup_node().unwrap();

        controller.close(&mut doc, now + ms(100));
        assert!(controller.open(&mut doc, now + ms(150)));
        let fresh = controller.popup_node().unwrap();
        assert_ne!(fresh, old);
        assert!(doc.layer(old).is_none());
        assert_eq!(popups(&doc), 1);
        assert_eq!(doc.count_layers(OWNER, LayerKind::Backdrop), 1);
        assert!(doc.is_scroll_locked());

        // the old removal deadline passes without touching the new instance
        controller.tick(&mut doc, now + ms(450));
        assert_eq!(controller.state(), PopupState::Open);
        assert_eq!(controller.popup_node(), Some(fresh));
        assert_eq!(doc.listener_count(OWNER), 2);
    }

    #[test]
    fn rapid_sequences_never_stack_popups() {
        let start = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Backdrop);
        let mut now = start;
        for i in 0..60u64 {
            now += ms((i * 37) % 130);
            match i % 5 {
                0 | 3 => {
                    controller.open(&mut doc, now);
                }
                1 | 4 => {
                    controller.close(&mut doc, now);
                }
                _ => controller.tick(&mut doc, now),
            }
            assert!(popups(&doc) <= 1, "step {i}");
            assert!(doc.count_layers(OWNER, LayerKind::Backdrop) <= 1, "step {i}");
            assert!(doc.listener_count(OWNER) <= 2, "step {i}");
            if !controller.state().is_live() {
                assert_eq!(doc.listener_count(OWNER), 0, "step {i}");
            }
        }
    }

    #[test]
    fn missing_anchor_is_a_silent_no_op() {
        let now = Instant::now();
        let mut doc = Document::new(120, 40);
        let mut controller = PopupController::new(
            OWNER,
            "nowhere",
            Variant::Plain,
            template(),
            terminal_rules(),
            Timing::default(),
            &mut doc,
        );
        assert!(!controller.open(&mut doc, now));
        assert_eq!(controller.state(), PopupState::Closed);
        assert!(doc.layers().is_empty());
        assert!(!doc.is_scroll_locked());
    }

    #[test]
    fn style_sheet_is_shared_between_controllers() {
        let (mut doc, _first) = setup(Variant::Plain);
        let _second = PopupController::new(
            OwnerId(2),
            ANCHOR,
            Variant::Backdrop,
            template(),
            terminal_rules(),
            Timing::default(),
            &mut doc,
        );
        assert_eq!(doc.style_count(), 1);
    }

    #[test]
    fn link_rows_resolve_to_their_target() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        open_settled(&mut doc, &mut controller, now);
        let geometry = *controller.geometry().unwrap();
        let row = controller.layout().unwrap().rows[0].clone();

        let on_value = doc.hit_test(geometry.left + row.value_x, geometry.top + row.y);
        assert_eq!(controller.link_at(&on_value).as_deref(), Some("mailto:breakaway@support.com"));
        let on_label = doc.hit_test(geometry.left + row.x, geometry.top + row.y);
        assert_eq!(controller.link_at(&on_label), None);
    }

    #[test]
    fn reflow_follows_a_narrower_viewport() {
        let now = Instant::now();
        let (mut doc, mut controller) = setup(Variant::Plain);
        open_settled(&mut doc, &mut controller, now);
        let wide = *controller.geometry().unwrap();

        doc.resize(40, 20);
        controller.reflow(&mut doc);
        let narrow = *controller.geometry().unwrap();
        assert!(narrow.width < wide.width);
        assert!(narrow.left + narrow.width <= 40 - 2);
    }
}
