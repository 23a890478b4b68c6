//! The host document the popups live in.
//!
//! It plays the part a browser page would: a scrollable viewport, named
//! anchor elements laid out by the page, style sheets registered by id, a
//! stack of overlay layers and the capture-phase listeners that get first
//! look at every pointer press.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use tracing::debug;

use crate::animation::Fade;
use crate::placement::{Bounds, Viewport};
use crate::theme::StyleSheet;

pub type NodeId = u64;
pub type ListenerId = u64;

/// Identifies the controller that owns a layer, listener or scroll lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Popup,
    Backdrop,
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub id: NodeId,
    pub owner: OwnerId,
    pub kind: LayerKind,
    /// Document coordinates. Backdrops ignore this and cover the viewport.
    pub bounds: Bounds,
    pub visible: bool,
    pub fade: Fade,
}

impl Layer {
    /// Inactive layers let presses fall through to whatever is below.
    fn takes_pointer(&self) -> bool {
        self.visible && self.fade.is_active()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerKind {
    PointerDown,
    TouchStart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CaptureListener {
    id: ListenerId,
    owner: OwnerId,
    kind: ListenerKind,
}

/// What a press landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HitTarget {
    Layer {
        id: NodeId,
        owner: OwnerId,
        kind: LayerKind,
        /// Point relative to the layer's top-left corner.
        local_x: i32,
        local_y: i32,
    },
    Anchor(String),
    Page,
}

impl HitTarget {
    /// True when the target is `node` itself or something inside it. Layer
    /// content has no node identity of its own, so a hit anywhere in the
    /// layer reports the layer.
    pub fn is_within(&self, node: NodeId) -> bool {
        matches!(self, Self::Layer { id, .. } if *id == node)
    }

    /// Same element, wherever inside it the point fell.
    pub fn same_element(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Layer { id: a, .. }, Self::Layer { id: b, .. }) => a == b,
            (Self::Anchor(a), Self::Anchor(b)) => a == b,
            (Self::Page, Self::Page) => true,
            _ => false,
        }
    }
}

pub struct Document {
    viewport: Viewport,
    content_height: i32,
    scroll_locks: BTreeSet<OwnerId>,
    anchors: Vec<(String, Bounds)>,
    styles: HashMap<String, StyleSheet>,
    layers: Vec<Layer>,
    listeners: Vec<CaptureListener>,
    next_node: NodeId,
    next_listener: ListenerId,
}

impl Document {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            content_height: height,
            scroll_locks: BTreeSet::new(),
            anchors: Vec::new(),
            styles: HashMap::new(),
            layers: Vec::new(),
            listeners: Vec::new(),
            next_node: 1,
            next_listener: 1,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.clamp_scroll();
    }

    pub fn set_content_height(&mut self, height: i32) {
        self.content_height = height;
        self.clamp_scroll();
    }

    fn max_scroll_y(&self) -> i32 {
        (self.content_height - self.viewport.height).max(0)
    }

    fn clamp_scroll(&mut self) {
        self.viewport.scroll_y = self.viewport.scroll_y.clamp(0, self.max_scroll_y());
    }

    /// Scrolls the page. Returns false when scrolling is locked or the page
    /// is already at the edge.
    pub fn scroll_by(&mut self, dy: i32) -> bool {
        if self.is_scroll_locked() {
            return false;
        }
        let before = self.viewport.scroll_y;
        self.viewport.scroll_y = (before + dy).clamp(0, self.max_scroll_y());
        self.viewport.scroll_y != before
    }

    pub fn lock_scroll(&mut self, owner: OwnerId) {
        self.scroll_locks.insert(owner);
    }

    pub fn unlock_scroll(&mut self, owner: OwnerId) {
        self.scroll_locks.remove(&owner);
    }

    pub fn is_scroll_locked(&self) -> bool {
        !self.scroll_locks.is_empty()
    }

    /// Registers (or moves) an anchor element, in document coordinates.
    pub fn set_anchor(&mut self, id: &str, bounds: Bounds) {
        match self.anchors.iter_mut().find(|(anchor, _)| anchor == id) {
            Some((_, existing)) => *existing = bounds,
            None => self.anchors.push((id.to_string(), bounds)),
        }
    }

    pub fn clear_anchors(&mut self) {
        self.anchors.clear();
    }

    /// Anchor box in viewport coordinates, the way a client rect reads.
    pub fn anchor_rect(&self, id: &str) -> Option<Bounds> {
        self.anchors
            .iter()
            .find(|(anchor, _)| anchor == id)
            .map(|(_, bounds)| bounds.offset(-self.viewport.scroll_x, -self.viewport.scroll_y))
    }

    /// Registers a style sheet once. A second injection under the same id is
    /// skipped and returns false.
    pub fn inject_style(&mut self, id: &str, sheet: StyleSheet) -> bool {
        if self.styles.contains_key(id) {
            debug!(id, "style sheet already present, skipping");
            return false;
        }
        self.styles.insert(id.to_string(), sheet);
        true
    }

    pub fn style(&self, id: &str) -> Option<&StyleSheet> {
        self.styles.get(id)
    }

    #[cfg(test)]
    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    /// Appends a layer on top of the stack. New layers start hidden.
    pub fn insert_layer(&mut self, owner: OwnerId, kind: LayerKind, bounds: Bounds, fade: Fade) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.layers.push(Layer {
            id,
            owner,
            kind,
            bounds,
            visible: false,
            fade,
        });
        id
    }

    pub fn remove_layer(&mut self, id: NodeId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|layer| layer.id != id);
        self.layers.len() != before
    }

    #[cfg(test)]
    pub fn layer(&self, id: NodeId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn layer_mut(&mut self, id: NodeId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    /// Bottom-to-top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[cfg(test)]
    pub fn count_layers(&self, owner: OwnerId, kind: LayerKind) -> usize {
        self.layers
            .iter()
            .filter(|layer| layer.owner == owner && layer.kind == kind)
            .count()
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.layers.iter().any(|layer| layer.fade.is_running(now))
    }

    pub fn add_listener(&mut self, owner: OwnerId, kind: ListenerKind) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push(CaptureListener { id, owner, kind });
        id
    }

    /// Returns false when no such listener is registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    #[cfg(test)]
    pub fn listener_count(&self, owner: OwnerId) -> usize {
        self.listeners.iter().filter(|listener| listener.owner == owner).count()
    }

    /// Owners with a capture listener for `kind`, in registration order.
    pub fn listener_owners(&self, kind: ListenerKind) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = Vec::new();
        for listener in self.listeners.iter().filter(|listener| listener.kind == kind) {
            if !owners.contains(&listener.owner) {
                owners.push(listener.owner);
            }
        }
        owners
    }

    /// Topmost thing under a viewport point.
    pub fn hit_test(&self, x: i32, y: i32) -> HitTarget {
        let doc_x = x + self.viewport.scroll_x;
        let doc_y = y + self.viewport.scroll_y;

        for layer in self.layers.iter().rev().filter(|layer| layer.takes_pointer()) {
            let hit = match layer.kind {
                LayerKind::Backdrop => true,
                LayerKind::Popup => layer.bounds.contains(doc_x, doc_y),
            };
            if hit {
                return HitTarget::Layer {
                    id: layer.id,
                    owner: layer.owner,
                    kind: layer.kind,
                    local_x: doc_x - layer.bounds.left,
                    local_y: doc_y - layer.bounds.top,
                };
            }
        }

        self.anchors
            .iter()
            .find(|(_, bounds)| bounds.contains(doc_x, doc_y))
            .map(|(id, _)| HitTarget::Anchor(id.clone()))
            .unwrap_or(HitTarget::Page)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::animation::TimeFunction;

    const OWNER: OwnerId = OwnerId(1);

    fn fade() -> Fade {
        Fade::new(Duration::from_millis(280), TimeFunction::STANDARD)
    }

    #[test]
    fn anchor_rect_is_relative_to_scroll() {
        let mut doc = Document::new(80, 20);
        doc.set_content_height(100);
        doc.set_anchor("contact-link", Bounds::new(10, 30, 12, 1));
        assert!(doc.scroll_by(25));
        assert_eq!(doc.anchor_rect("contact-link"), Some(Bounds::new(10, 5, 12, 1)));
        assert_eq!(doc.anchor_rect("missing"), None);
    }

    #[test]
    fn scroll_is_clamped_and_lockable() {
        let mut doc = Document::new(80, 20);
        doc.set_content_height(30);
        assert!(doc.scroll_by(100));
        assert_eq!(doc.viewport().scroll_y, 10);
        assert!(!doc.scroll_by(1));

        doc.lock_scroll(OWNER);
        doc.lock_scroll(OwnerId(2));
        assert!(!doc.scroll_by(-5));
        doc.unlock_scroll(OWNER);
        assert!(doc.is_scroll_locked());
        doc.unlock_scroll(OwnerId(2));
        assert!(doc.scroll_by(-5));
        assert_eq!(doc.viewport().scroll_y, 5);
    }

    #[test]
    fn style_is_injected_once() {
        let mut doc = Document::new(80, 20);
        assert!(doc.inject_style("contact-popup-style", StyleSheet::default()));
        assert!(!doc.inject_style("contact-popup-style", StyleSheet::default()));
        assert_eq!(doc.style_count(), 1);
    }

    #[test]
    fn inactive_layers_let_presses_through() {
        let mut doc = Document::new(80, 20);
        doc.set_anchor("contact-link", Bounds::new(2, 2, 10, 1));
        let popup = doc.insert_layer(OWNER, LayerKind::Popup, Bounds::new(0, 0, 20, 5), fade());
        doc.layer_mut(popup).unwrap().visible = true;
        assert_eq!(doc.hit_test(3, 2), HitTarget::Anchor("contact-link".into()));

        doc.layer_mut(popup).unwrap().fade.set_active(true, Instant::now());
        assert!(doc.hit_test(3, 2).is_within(popup));
        assert_eq!(doc.hit_test(30, 10), HitTarget::Page);
    }

    #[test]
    fn backdrop_covers_everything_below_the_popup() {
        let now = Instant::now();
        let mut doc = Document::new(80, 20);
        let backdrop = doc.insert_layer(OWNER, LayerKind::Backdrop, Bounds::new(0, 0, 80, 20), fade());
        let popup = doc.insert_layer(OWNER, LayerKind::Popup, Bounds::new(10, 5, 20, 5), fade());
        for id in [backdrop, popup] {
            let layer = doc.layer_mut(id).unwrap();
            layer.visible = true;
            layer.fade.set_active(true, now);
        }
        assert!(doc.hit_test(0, 0).is_within(backdrop));
        match doc.hit_test(12, 6) {
            HitTarget::Layer { id, local_x, local_y, .. } => {
                assert_eq!(id, popup);
                assert_eq!((local_x, local_y), (2, 1));
            }
            other => panic!("expected popup hit, got {other:?}"),
        }
    }

    #[test]
    fn same_element_ignores_the_point_inside_it() {
        let a = HitTarget::Layer {
            id: 3,
            owner: OWNER,
            kind: LayerKind::Popup,
            local_x: 1,
            local_y: 1,
        };
        let b = HitTarget::Layer {
            id: 3,
            owner: OWNER,
            kind: LayerKind::Popup,
            local_x: 7,
            local_y: 2,
        };
        assert!(a.same_element(&b));
        assert!(!a.same_element(&HitTarget::Page));
        assert!(!HitTarget::Anchor("a".to_string()).same_element(&HitTarget::Anchor("b".to_string())));
    }

    #[test]
    fn listener_removal_is_idempotent() {
        let mut doc = Document::new(80, 20);
        let down = doc.add_listener(OWNER, ListenerKind::PointerDown);
        doc.add_listener(OWNER, ListenerKind::TouchStart);
        assert_eq!(doc.listener_owners(ListenerKind::PointerDown), vec![OWNER]);
        assert!(doc.remove_listener(down));
        assert!(!doc.remove_listener(down));
        assert_eq!(doc.listener_count(OWNER), 1);
    }
}
