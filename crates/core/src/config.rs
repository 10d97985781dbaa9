//! Style configuration: unified font, color map, and connector detection.

use crate::color::ColorMap;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Font applied to every text run when nothing else is configured.
pub const DEFAULT_FONT_NAME: &str = "맑은 고딕";

/// Shape-name fragments that mark connectors and arrows, in Korean and
/// English PowerPoint naming.
pub const DEFAULT_CONNECTOR_MARKERS: &[&str] = &["연결선", "화살표", "Connector", "Arrow"];

/// Everything the restyling pass needs, passed explicitly into the walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Typeface written to every text run.
    pub font_name: String,

    /// Also set the East-Asian typeface (`a:ea`) of each run.
    pub east_asian: bool,

    /// Shapes whose name contains one of these are left with their outline
    /// untouched.
    pub connector_markers: Vec<String>,

    /// Color substitution table.
    pub colors: ColorMap,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_name: DEFAULT_FONT_NAME.to_string(),
            east_asian: false,
            connector_markers: DEFAULT_CONNECTOR_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            colors: ColorMap::builtin(),
        }
    }
}

impl StyleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileNotFound {
                path: path.display().to_string(),
                source,
            })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseFailed { reason, .. } => ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    ///
    /// Color values are checked while parsing; call [`StyleConfig::validate`]
    /// once any overrides have been applied.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed {
            path: "<inline>".to_string(),
            reason: e.message().to_string(),
        })
    }

    /// Replace the unified font.
    pub fn with_font_name(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }

    /// Replace the color map.
    pub fn with_colors(mut self, colors: ColorMap) -> Self {
        self.colors = colors;
        self
    }

    /// Set whether the East-Asian typeface is rewritten too.
    pub fn with_east_asian(mut self, east_asian: bool) -> Self {
        self.east_asian = east_asian;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.font_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "font_name".to_string(),
                value: self.font_name.clone(),
            });
        }

        if let Some(marker) = self.connector_markers.iter().find(|m| m.is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "connector_markers".to_string(),
                value: format!("{:?}", marker),
            });
        }

        for (from, to) in self.colors.chained_entries() {
            log::warn!(
                "Color {} maps to {}, which is itself remapped; a second pass will change it again",
                from,
                to
            );
        }

        Ok(())
    }

    /// Whether a shape name marks a connector or arrow.
    ///
    /// Both sides are compared in NFC so names stored decomposed (as some
    /// macOS tools write Hangul) still match.
    pub fn is_connector_name(&self, name: &str) -> bool {
        let name: String = name.nfc().collect();
        self.connector_markers
            .iter()
            .any(|marker| name.contains(&marker.nfc().collect::<String>()))
    }
}
