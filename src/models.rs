use serde::{Deserialize, Serialize};

/// Lifecycle of one popup instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PopupState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl PopupState {
    /// Opening or Open: the states that hold outside-click listeners.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Opening | Self::Open)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// No backdrop; any press outside the popup closes it.
    #[default]
    Plain,
    /// Dimming backdrop and pointer triangle; only presses on the backdrop close.
    Backdrop,
}

impl Variant {
    pub fn has_backdrop(self) -> bool {
        matches!(self, Self::Backdrop)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContactValue {
    Text(String),
    Link { text: String, href: String },
}

impl ContactValue {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Link { text, .. } => text,
        }
    }

    pub fn href(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Link { href, .. } => Some(href),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactRow {
    pub label: String,
    pub value: ContactValue,
}
