//! Error types for procwatch.
//!
//! Failures local to one rule or one action never halt the pipeline: the
//! rule engine catches and logs [`ActionError`]s, and
//! [`RuleCompileError`]s are reported per rule without aborting the
//! registration of others. Failures in process spawning are fatal to
//! `start()` and surface synchronously as [`SpawnError`].
//!
//! End-of-stream is not an error anywhere in this crate: `read()` and
//! `recv()` report it as `None`.

use std::time::Duration;

use thiserror::Error;

/// Errors related to process spawning.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The configured command was empty.
    #[error("command is empty")]
    EmptyCommand,

    /// Command not found.
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The command that was not found.
        command: String,
    },

    /// Permission denied.
    #[error("permission denied: {command}")]
    PermissionDenied {
        /// The command that could not be executed.
        command: String,
    },

    /// General I/O error during spawn.
    #[error("I/O error during spawn: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Classify an I/O error from process creation.
    pub(crate) fn from_io(command: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::CommandNotFound {
                command: command.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                command: command.to_string(),
            },
            _ => Self::Io(err),
        }
    }
}

/// The main error type for supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Failed to spawn the child process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// `start()` was called on a supervisor that is already running.
    #[error("supervisor already started")]
    AlreadyStarted,

    /// An operation requiring a running child was called before `start()`.
    #[error("supervisor not started")]
    NotStarted,

    /// `write()` was called but the configuration does not manage stdin.
    #[error("input stream is not managed (enable manage_input)")]
    InputNotManaged,

    /// `read_err()` was called but stderr is merged into the output channel.
    #[error("error stream is not managed (enable dedicated_error_stream)")]
    ErrorStreamNotManaged,

    /// An I/O error occurred while waiting on or killing the child.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while compiling a rule description.
///
/// Each failure names the offending rule so that a batch registration can
/// report every bad description individually.
#[derive(Debug, Error)]
pub enum RuleCompileError {
    /// The condition pattern failed to compile.
    #[error("rule '{rule}': invalid condition pattern: {source}")]
    BadCondition {
        /// The name of the offending rule.
        rule: String,
        /// The regex compilation failure.
        #[source]
        source: regex::Error,
    },

    /// A removal pattern failed to compile.
    #[error("rule '{rule}': invalid removal pattern #{index}: {source}")]
    BadRemoval {
        /// The name of the offending rule.
        rule: String,
        /// Position of the bad pattern in the removal list.
        index: usize,
        /// The regex compilation failure.
        #[source]
        source: regex::Error,
    },

    /// The action name is not present in the registry.
    #[error("rule '{rule}': unknown action '{action}'")]
    UnknownAction {
        /// The name of the offending rule.
        rule: String,
        /// The unresolved action name.
        action: String,
    },
}

impl RuleCompileError {
    /// The name of the rule that failed to compile.
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            Self::BadCondition { rule, .. }
            | Self::BadRemoval { rule, .. }
            | Self::UnknownAction { rule, .. } => rule,
        }
    }
}

/// Failure returned by an action handler during dispatch.
///
/// Action errors are caught and logged by the rule engine; they never
/// propagate to the reader tasks or abort evaluation of remaining rules.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The handler reported a failure.
    #[error("action failed: {message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },

    /// The handler did not complete within the engine's action timeout.
    #[error("action timed out after {duration:?}")]
    TimedOut {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// An I/O error inside the handler.
    #[error("action I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Create a failure with the given message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Errors raised while parsing a rules file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file extension does not map to a supported format.
    #[error("unrecognized rules file format: {path}")]
    UnknownFormat {
        /// The path whose format could not be detected.
        path: String,
    },

    /// JSON deserialization failed.
    #[error("invalid JSON rules: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization failed.
    #[error("invalid TOML rules: {0}")]
    Toml(#[from] toml::de::Error),

    /// Reading the file failed.
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;
