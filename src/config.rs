//! Overlay configuration, loaded from TOML

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OverlayError, Result};

/// Reply used by the bundled canned generator
pub const DEFAULT_CANNED_REPLY: &str = "Thank you for the opportunity! If you have any more questions or if there's anything else I can help you with, feel free to ask.";

/// How the host page marks its composition field.
///
/// This is third-party markup and changes whenever the host page does; keep
/// every string that depends on it here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldContract {
    /// Attribute the host page sets on the focused editor
    pub marker_attribute: String,
    /// Value the marker attribute must carry
    pub marker_value: String,
    /// Class of the host page's message-composition widget
    pub composition_class: String,
}

impl Default for FieldContract {
    fn default() -> Self {
        Self {
            marker_attribute: "data-artdeco-is-focused".to_string(),
            marker_value: "true".to_string(),
            composition_class: "msg-form__contenteditable".to_string(),
        }
    }
}

/// Configuration for the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub field: FieldContract,

    /// Reserved id of the trigger affordance node
    pub trigger_id: String,

    /// Reserved id of the panel host layer
    pub panel_id: String,

    /// Inset of the trigger from the field's bottom-right corner
    pub trigger_inset_px: u32,

    /// Event type the host page listens to for content changes
    pub input_event: String,

    /// Upper bound on a single generation
    pub generation_timeout_ms: u64,

    /// Reply returned by the canned generator
    pub canned_reply: String,

    /// Prefix for bundled icon assets (the extension's runtime URL)
    pub asset_base: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            field: FieldContract::default(),
            trigger_id: "ai-icon".to_string(),
            panel_id: "ai-modal".to_string(),
            trigger_inset_px: 15,
            input_event: "input".to_string(),
            generation_timeout_ms: 30_000,
            canned_reply: DEFAULT_CANNED_REPLY.to_string(),
            asset_base: String::new(),
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: FieldContract) -> Self {
        self.field = field;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        // sub-millisecond timeouts round up to 1ms
        self.generation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn with_canned_reply(mut self, reply: impl Into<String>) -> Self {
        self.canned_reply = reply.into();
        self
    }

    pub fn with_asset_base(mut self, base: impl Into<String>) -> Self {
        self.asset_base = base.into();
        self
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// `<config dir>/compose-overlay/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("compose-overlay").join("config.toml"))
    }

    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load from `path`, or from the default location if it exists, or fall
    /// back to defaults. An explicit path that does not exist is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trigger_id.trim().is_empty() || self.panel_id.trim().is_empty() {
            return Err(OverlayError::Config(
                "trigger_id and panel_id must not be empty".to_string(),
            ));
        }
        if self.trigger_id == self.panel_id {
            return Err(OverlayError::Config(format!(
                "trigger_id and panel_id must differ (both are {:?})",
                self.trigger_id
            )));
        }
        if self.field.marker_attribute.trim().is_empty() {
            return Err(OverlayError::Config("field.marker_attribute must not be empty".to_string()));
        }
        if self.field.composition_class.trim().is_empty()
            || self.field.composition_class.contains(char::is_whitespace)
        {
            return Err(OverlayError::Config(
                "field.composition_class must be a single class name".to_string(),
            ));
        }
        if self.input_event.trim().is_empty() {
            return Err(OverlayError::Config("input_event must not be empty".to_string()));
        }
        if self.generation_timeout_ms == 0 {
            return Err(OverlayError::Config("generation_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OverlayConfig::from_toml(
            r#"
            trigger_inset_px = 8

            [field]
            composition_class = "composer"
            "#,
        )
        .unwrap();

        assert_eq!(config.trigger_inset_px, 8);
        assert_eq!(config.field.composition_class, "composer");
        assert_eq!(config.field.marker_attribute, "data-artdeco-is-focused");
        assert_eq!(config.trigger_id, "ai-icon");
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let config = OverlayConfig::new().with_generation_timeout(Duration::from_micros(200));
        assert_eq!(config.generation_timeout_ms, 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.generation_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_rejects_shared_ids() {
        let err = OverlayConfig::from_toml("trigger_id = \"x\"\npanel_id = \"x\"").unwrap_err();
        assert!(matches!(err, OverlayError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = OverlayConfig::from_toml("generation_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, OverlayError::Config(_)));
    }

    #[test]
    fn test_rejects_multi_token_class() {
        let err = OverlayConfig::from_toml("[field]\ncomposition_class = \"a b\"").unwrap_err();
        assert!(matches!(err, OverlayError::Config(_)));
    }
}
