//! Configuration constants and event source settings.
//!
//! The event source is configured by an explicit [`SourceConfig`] value passed
//! by the caller; there is no process-wide default parser.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Line reported when no position has ever been established.
pub const UNKNOWN_LINE: i64 = -1;

/// Column reported when no position has ever been established.
pub const UNKNOWN_COLUMN: i64 = -1;

/// Default maximum element nesting depth accepted by the XML source.
///
/// Guards the handler stack against pathologically deep documents.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Initial capacity of the diagnostic list kept by a parse.
pub const INITIAL_ERROR_CAPACITY: usize = 32;

/// Settings for [`QuickXmlSource`](crate::xml::QuickXmlSource).
///
/// Deserializes with defaults for missing fields, so a partial configuration
/// file only needs the settings it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Trim whitespace from the start and end of text chunks.
    pub trim_text: bool,

    /// Fail when an end tag does not match its start tag.
    pub check_end_names: bool,

    /// Fail on `--` inside comments.
    pub check_comments: bool,

    /// Maximum element nesting depth.
    pub max_depth: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            trim_text: false,
            check_end_names: true,
            check_comments: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SourceConfig {
    /// Check that the settings are usable.
    ///
    /// # Examples
    /// ```
    /// use stackbind::config::SourceConfig;
    ///
    /// assert!(SourceConfig::default().validate().is_ok());
    /// let zero = SourceConfig { max_depth: 0, ..SourceConfig::default() };
    /// assert!(zero.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_reasonable() {
        assert!(DEFAULT_MAX_DEPTH >= 64, "Should allow realistic nesting");
        assert!(INITIAL_ERROR_CAPACITY > 0, "Should preallocate");
        assert_eq!((UNKNOWN_LINE, UNKNOWN_COLUMN), (-1, -1));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SourceConfig = serde_json::from_str(r#"{"trim_text": true}"#).unwrap();
        assert!(config.trim_text);
        assert!(config.check_end_names);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let config = SourceConfig {
            max_depth: 0,
            ..SourceConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_depth"));
    }
}
