//! Declarative rule descriptions.
//!
//! These structures are the already-parsed shape the rule engine consumes.
//! Where the configuration comes from (which file, which flags) is the
//! caller's business; this module only decodes JSON or TOML text into
//! [`RuleSpec`] values.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rules file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesFormat {
    /// JSON format.
    Json,
    /// TOML format.
    Toml,
}

impl RulesFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Detect format from path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A declarative description of one rule.
///
/// Patterns are regex source strings, compiled at registration time;
/// `action` names a handler pre-registered in the
/// [`ActionRegistry`](crate::ActionRegistry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Optional rule name, used in diagnostics. Unnamed rules are given a
    /// positional name at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Pattern tested against each line.
    pub condition: String,

    /// Patterns substituted to the empty string, in order, when the
    /// condition matches.
    #[serde(default)]
    pub remove_patterns: Vec<String>,

    /// Name of the registered action to invoke with the transformed text.
    pub action: String,

    /// Free-form arguments passed to the action handler on every
    /// dispatch, as the second parameter of
    /// [`Action::invoke`](crate::Action::invoke).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub args: HashMap<String, serde_json::Value>,
}

impl RuleSpec {
    /// Create a minimal spec with a condition and an action name.
    #[must_use]
    pub fn new(condition: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: None,
            condition: condition.into(),
            remove_patterns: Vec::new(),
            action: action.into(),
            args: HashMap::new(),
        }
    }

    /// Set the rule name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a removal pattern.
    #[must_use]
    pub fn remove(mut self, pattern: impl Into<String>) -> Self {
        self.remove_patterns.push(pattern.into());
        self
    }

    /// Set one action argument.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// The `rules` list of a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesFile {
    /// Rule descriptions in registration order.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl RulesFile {
    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse text in the given format.
    pub fn from_str_format(text: &str, format: RulesFormat) -> Result<Self, ConfigError> {
        match format {
            RulesFormat::Json => Self::from_json(text),
            RulesFormat::Toml => Self::from_toml(text),
        }
    }

    /// Read and parse a rules file, detecting the format from its
    /// extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = RulesFormat::from_path(path).ok_or_else(|| ConfigError::UnknownFormat {
            path: path.display().to_string(),
        })?;
        let text = std::fs::read_to_string(path)?;
        Self::from_str_format(&text, format)
    }
}
