use crate::config::PageSettings;
use crate::document::Document;
use crate::placement::Bounds;
use crate::utils::display_width;

/// Columns left free on the left of every page line.
pub const PAGE_MARGIN: i32 = 2;
const LINK_SEPARATOR: &str = "   ";
/// The paragraphs are repeated so the page is tall enough to scroll.
const FILLER_REPEAT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Title,
    Nav,
    Body,
    Footer,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// Set for link segments: the anchor element id.
    pub anchor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLine {
    pub kind: LineKind,
    pub segments: Vec<Segment>,
}

impl PageLine {
    fn text(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            segments: vec![Segment {
                text: text.into(),
                anchor: None,
            }],
        }
    }

    fn blank() -> Self {
        Self {
            kind: LineKind::Blank,
            segments: Vec::new(),
        }
    }
}

/// A static page: title, a navigation line holding the popup links, and
/// body text.
pub struct Page {
    lines: Vec<PageLine>,
}

impl Page {
    /// `links` are `(anchor id, link text)` pairs, in display order.
    pub fn new(settings: &PageSettings, links: &[(String, String)]) -> Self {
        let mut lines = vec![PageLine::blank(), PageLine::text(LineKind::Title, &settings.title)];

        let mut nav = vec![Segment {
            text: format!("Home{LINK_SEPARATOR}Rides{LINK_SEPARATOR}Profile{LINK_SEPARATOR}"),
            anchor: None,
        }];
        for (i, (anchor, label)) in links.iter().enumerate() {
            if i > 0 {
                nav.push(Segment {
                    text: LINK_SEPARATOR.to_string(),
                    anchor: None,
                });
            }
            nav.push(Segment {
                text: label.clone(),
                anchor: Some(anchor.clone()),
            });
        }
        lines.push(PageLine {
            kind: LineKind::Nav,
            segments: nav,
        });
        lines.push(PageLine::blank());

        for _ in 0..FILLER_REPEAT {
            for paragraph in &settings.paragraphs {
                lines.push(PageLine::text(LineKind::Body, paragraph));
                lines.push(PageLine::blank());
            }
        }
        lines.push(PageLine::text(
            LineKind::Footer,
            "q quit | ↑/↓ PgUp/PgDn wheel scroll | click a link to open its popup",
        ));

        Self { lines }
    }

    pub fn lines(&self) -> &[PageLine] {
        &self.lines
    }

    pub fn height(&self) -> i32 {
        self.lines.len() as i32
    }

    /// Link boxes in document coordinates.
    pub fn anchors(&self) -> Vec<(String, Bounds)> {
        let mut out = Vec::new();
        for (row, line) in self.lines.iter().enumerate() {
            let mut x = PAGE_MARGIN;
            for segment in &line.segments {
                let width = display_width(&segment.text);
                if let Some(anchor) = &segment.anchor {
                    out.push((anchor.clone(), Bounds::new(x, row as i32, width, 1)));
                }
                x += width;
            }
        }
        out
    }

    /// Lays the page into the document: content height and anchor elements.
    pub fn register(&self, doc: &mut Document) {
        doc.set_content_height(self.height());
        doc.clear_anchors();
        for (anchor, bounds) in self.anchors() {
            doc.set_anchor(&anchor, bounds);
        }
    }
}
