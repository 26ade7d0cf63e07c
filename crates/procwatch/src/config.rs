//! Configuration types for procwatch.
//!
//! [`SupervisorConfig`] describes the child process to supervise and which
//! of the three stream channels (output, error, input) are created. It is
//! set once at construction and immutable after `start()`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub mod rules;

/// Default capacity for each line channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default grace period between closing stdin and force-killing on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default bound on a single action invocation.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Line ending appended to written input that lacks a terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix-style line ending (LF).
    Lf,

    /// Windows-style line ending (CRLF).
    #[default]
    CrLf,

    /// Classic Mac line ending (CR).
    Cr,
}

impl LineEnding {
    /// Get the line ending as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Get the line ending as bytes.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::Cr => b"\r",
        }
    }
}

/// Configuration for a [`Supervisor`](crate::Supervisor).
///
/// `manage_input` and `dedicated_error_stream` determine which channels
/// and tasks are created:
///
/// - the output channel always exists;
/// - `dedicated_error_stream` gives stderr its own channel, otherwise
///   stderr lines are merged into the output channel;
/// - `manage_input` pipes stdin and creates the input channel, otherwise
///   stdin is closed.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// The command to execute.
    pub command: String,

    /// Command arguments.
    pub args: Vec<String>,

    /// Environment variables to set on the child.
    pub env: HashMap<String, String>,

    /// Whether to inherit the parent environment.
    pub inherit_env: bool,

    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,

    /// Whether to pipe stdin and create the input channel.
    pub manage_input: bool,

    /// Whether stderr gets its own channel instead of merging into stdout.
    pub dedicated_error_stream: bool,

    /// Capacity of each created line channel.
    pub channel_capacity: usize,

    /// Terminator appended by `write()` when the payload lacks one.
    pub line_ending: LineEnding,

    /// Grace period before `shutdown()` escalates to a force-kill.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            inherit_env: true,
            working_dir: None,
            manage_input: false,
            dedicated_error_stream: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            line_ending: LineEnding::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl SupervisorConfig {
    /// Create a new configuration with the given command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Create a configuration that runs a whole command line via the
    /// system shell (`/bin/sh -c` on Unix, `cmd /C` on Windows).
    #[must_use]
    pub fn shell(command_line: impl Into<String>) -> Self {
        #[cfg(unix)]
        let (shell, flag) = ("/bin/sh", "-c");
        #[cfg(not(unix))]
        let (shell, flag) = ("cmd", "/C");

        Self {
            command: shell.to_string(),
            args: vec![flag.to_string(), command_line.into()],
            ..Default::default()
        }
    }

    /// Set the command arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set whether to inherit the parent environment.
    #[must_use]
    pub const fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Pipe stdin and create the input channel.
    #[must_use]
    pub const fn manage_input(mut self, manage: bool) -> Self {
        self.manage_input = manage;
        self
    }

    /// Give stderr its own channel instead of merging into stdout.
    #[must_use]
    pub const fn dedicated_error_stream(mut self, dedicated: bool) -> Self {
        self.dedicated_error_stream = dedicated;
        self
    }

    /// Set the capacity of each created line channel.
    #[must_use]
    pub const fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the line ending appended by `write()`.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub const fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SupervisorConfig::new("/bin/cat");
        assert_eq!(config.command, "/bin/cat");
        assert!(config.args.is_empty());
        assert!(config.inherit_env);
        assert!(!config.manage_input);
        assert!(!config.dedicated_error_stream);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert_eq!(config.shutdown_grace, DEFAULT_SHUTDOWN_GRACE);
    }

    #[test]
    fn builder_chain() {
        let config = SupervisorConfig::new("/bin/sh")
            .arg("-c")
            .arg("echo hi")
            .env("WATCHED", "1")
            .inherit_env(false)
            .manage_input(true)
            .dedicated_error_stream(true)
            .channel_capacity(16)
            .line_ending(LineEnding::Lf)
            .shutdown_grace(Duration::from_millis(100));

        assert_eq!(config.args, vec!["-c", "echo hi"]);
        assert_eq!(config.env.get("WATCHED"), Some(&"1".to_string()));
        assert!(!config.inherit_env);
        assert!(config.manage_input);
        assert!(config.dedicated_error_stream);
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.line_ending, LineEnding::Lf);
    }

    #[cfg(unix)]
    #[test]
    fn shell_config_uses_sh() {
        let config = SupervisorConfig::shell("echo hello | wc -c");
        assert_eq!(config.command, "/bin/sh");
        assert_eq!(config.args, vec!["-c", "echo hello | wc -c"]);
    }

    #[test]
    fn line_ending_bytes() {
        assert_eq!(LineEnding::Lf.as_bytes(), b"\n");
        assert_eq!(LineEnding::CrLf.as_bytes(), b"\r\n");
        assert_eq!(LineEnding::Cr.as_str(), "\r");
    }
}
