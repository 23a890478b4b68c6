use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::controller::Timing;
use crate::models::Variant;
use crate::placement::PlacementRules;
use crate::template::PopupTemplate;

/// Project defaults, compiled in so the binary runs from any directory.
const BLUEPRINT: &str = include_str!("../contact-popup.toml");
const LOCAL_FILE: &str = "contact-popup.toml";

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub placement: PlacementRules,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub page: PageSettings,
    pub popups: Vec<PopupSettings>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PageSettings {
    pub title: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PopupSettings {
    /// Id of the page link that opens this popup.
    pub anchor: String,
    /// Link text shown on the page.
    pub label: String,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default = "default_colon")]
    pub colon: String,
    pub rows: Vec<RowSettings>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RowSettings {
    pub label: String,
    pub value: String,
    /// Makes the value a link, e.g. `mailto:`.
    pub href: Option<String>,
}

fn default_colon() -> String {
    ":".to_string()
}

impl PopupSettings {
    pub fn template(&self) -> PopupTemplate {
        self.rows
            .iter()
            .fold(PopupTemplate::builder().colon(self.colon.clone()), |builder, row| match &row.href {
                Some(href) => builder.link_row(&row.label, &row.value, href),
                None => builder.text_row(&row.label, &row.value),
            })
            .build()
    }
}

/// Settings that parse but make no sense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    NoPopups,
    EmptyAnchor,
    DuplicateAnchor(String),
    EmptyRows(String),
    RemovalBeforeTransition { removal_ms: u64, transition_ms: u64 },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPopups => write!(f, "no popups configured"),
            Self::EmptyAnchor => write!(f, "popup anchor id must not be empty"),
            Self::DuplicateAnchor(anchor) => write!(f, "anchor '{anchor}' is used by more than one popup"),
            Self::EmptyRows(anchor) => write!(f, "popup '{anchor}' has no rows"),
            Self::RemovalBeforeTransition {
                removal_ms,
                transition_ms,
            } => write!(
                f,
                "removal delay ({removal_ms} ms) is shorter than the transition ({transition_ms} ms)"
            ),
        }
    }
}

impl std::error::Error for SettingsError {}

impl Settings {
    /// Layers, lowest priority first: built-in blueprint, user config,
    /// `./contact-popup.toml`, then `extra` (required when given).
    pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::from_str(BLUEPRINT, FileFormat::Toml));
        if let Some(user_config_path) = get_user_config_path() {
            builder = builder.add_source(File::from(user_config_path).required(false));
        }
        builder = builder.add_source(File::from(PathBuf::from(LOCAL_FILE)).required(false));
        if let Some(extra) = extra {
            builder = builder.add_source(File::from(extra.to_path_buf()).required(true));
        }
        builder.build()?.try_deserialize()
    }

    #[cfg(test)]
    pub(crate) fn from_blueprint() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(BLUEPRINT, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.popups.is_empty() {
            return Err(SettingsError::NoPopups);
        }
        let mut seen = HashSet::new();
        for popup in &self.popups {
            if popup.anchor.trim().is_empty() {
                return Err(SettingsError::EmptyAnchor);
            }
            if !seen.insert(popup.anchor.as_str()) {
                return Err(SettingsError::DuplicateAnchor(popup.anchor.clone()));
            }
            if popup.rows.is_empty() {
                return Err(SettingsError::EmptyRows(popup.anchor.clone()));
            }
        }
        if self.timing.removal_delay_ms < self.timing.transition_ms {
            return Err(SettingsError::RemovalBeforeTransition {
                removal_ms: self.timing.removal_delay_ms,
                transition_ms: self.timing.transition_ms,
            });
        }
        Ok(())
    }

    /// Forces one variant on every popup.
    pub fn override_variant(&mut self, variant: Variant) {
        for popup in &mut self.popups {
            popup.variant = variant;
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

pub fn get_user_config_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".config");
    path.push("contact-popup");
    path.push("contact-popup.toml");
    Some(path)
}
