//! procwatch: supervise a child process and react to its output.
//!
//! This crate supervises one long-lived child process, multiplexes its
//! standard streams through bounded line channels, and evaluates
//! pattern-based rules against every output line. A matching rule can
//! strip parts of the line and dispatch the result to a pre-registered
//! action handler.
//!
//! # Features
//!
//! - **Async-first design** with Tokio runtime
//! - **Bounded, lossy stream buffering** with an explicit evict-oldest
//!   overflow policy and a deterministic end-of-stream sentinel
//! - **Declarative rules** (regex condition, ordered removal patterns,
//!   named action) loadable from JSON or TOML
//! - **Failure isolation**: a misbehaving action never stalls the stream
//!   or the remaining rules
//!
//! # Example
//!
//! ```ignore
//! use procwatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SupervisorError> {
//!     let mut supervisor = Supervisor::spawn(SupervisorConfig::shell("make build"))?;
//!
//!     let registry = ActionRegistry::with_builtins();
//!     let mut engine = RuleEngine::new(registry);
//!     engine
//!         .register(&RuleSpec::new("^ERROR", "log").remove(r"\d+"))
//!         .expect("valid rule");
//!
//!     let stats = engine.run(&mut supervisor).await?;
//!     println!("{} lines, {} rules fired", stats.lines_evaluated, stats.rules_fired);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod rule;
pub mod supervisor;
pub mod types;

pub use action::{Action, ActionArgs, ActionRegistry, FnAction, LogAction};
pub use channel::{LineReceiver, LineSender, line_channel};
pub use config::rules::{RuleSpec, RulesFile, RulesFormat};
pub use config::{
    DEFAULT_ACTION_TIMEOUT, DEFAULT_CHANNEL_CAPACITY, DEFAULT_SHUTDOWN_GRACE, LineEnding,
    SupervisorConfig,
};
pub use engine::{EngineStats, RuleEngine};
pub use error::{
    ActionError, ConfigError, Result, RuleCompileError, SpawnError, SupervisorError,
};
pub use rule::{Evaluation, Rule};
pub use supervisor::Supervisor;
pub use types::{Line, ProcessStatus};
