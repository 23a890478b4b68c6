//! Placement arithmetic for an anchored popup.
//!
//! Everything here is pure: the controller feeds in the anchor's bounding box
//! (viewport coordinates, like a client rect), the measured popup size and the
//! viewport, and gets back document coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned box. Coordinates are signed so that boxes scrolled above or
/// left of the viewport stay representable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    pub const fn right(&self) -> i32 {
        self.left + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Horizontal center of the box, rounded down.
    pub const fn center_x(&self) -> i32 {
        self.left + self.width / 2
    }

    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }

    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Visible area of the document plus its current scroll offsets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

impl Viewport {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height, scroll_x: 0, scroll_y: 0 }
    }

    #[cfg(test)]
    pub const fn scrolled(self, scroll_x: i32, scroll_y: i32) -> Self {
        Self { scroll_x, scroll_y, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlacementRules {
    /// Distance between the anchor edge and the popup.
    pub gap: i32,
    /// Space kept free between the popup and the right/bottom viewport edge.
    pub edge_margin: i32,
    /// Lowest `left`/`top` a clamped popup may take.
    pub min_margin: i32,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            gap: 8,
            edge_margin: 12,
            min_margin: 8,
        }
    }
}

/// Pointer triangle metrics (backdrop variant).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriangleRules {
    pub width: i32,
    pub min_offset: i32,
    pub max_inset: i32,
}

impl Default for TriangleRules {
    fn default() -> Self {
        Self {
            width: 16,
            min_offset: 16,
            max_inset: 32,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopupGeometry {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
    /// Popup sits above the anchor because it did not fit below.
    pub flipped: bool,
    pub triangle_offset: Option<i32>,
}

impl PopupGeometry {
    pub const fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.top, self.width, self.height)
    }
}

/// Position before the popup has been measured: right below the anchor,
/// left edges aligned.
pub fn tentative_position(anchor: Bounds, viewport: &Viewport, rules: &PlacementRules) -> (i32, i32) {
    let top = anchor.bottom() + viewport.scroll_y + rules.gap;
    let left = anchor.left + viewport.scroll_x;
    (top, left)
}

/// Final placement once the popup's natural size is known.
pub fn place(
    anchor: Bounds,
    popup: Size,
    viewport: &Viewport,
    rules: &PlacementRules,
    triangle: Option<&TriangleRules>,
) -> PopupGeometry {
    let (mut top, mut left) = tentative_position(anchor, viewport, rules);

    if left + popup.width > viewport.width - rules.edge_margin {
        left = viewport.width - popup.width - rules.edge_margin;
        if left < rules.min_margin {
            left = rules.min_margin;
        }
    }

    let mut flipped = false;
    if top + popup.height > viewport.height - rules.edge_margin {
        top = anchor.top + viewport.scroll_y - popup.height - rules.gap;
        if top < rules.min_margin {
            top = rules.min_margin;
        }
        flipped = true;
    }

    let triangle_offset =
        triangle.map(|rules| triangle_offset(anchor, viewport, left, popup.width, rules));

    PopupGeometry {
        top,
        left,
        width: popup.width,
        height: popup.height,
        flipped,
        triangle_offset,
    }
}

/// Horizontal triangle offset inside the popup so that it points at the
/// anchor's center. The lower bound wins when the popup is too narrow for
/// the allowed range.
pub fn triangle_offset(
    anchor: Bounds,
    viewport: &Viewport,
    popup_left: i32,
    popup_width: i32,
    rules: &TriangleRules,
) -> i32 {
    let anchor_center = anchor.center_x() + viewport.scroll_x;
    let raw = anchor_center - popup_left - rules.width / 2;
    raw.min(popup_width - rules.max_inset).max(rules.min_offset)
}
