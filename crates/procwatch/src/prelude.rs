//! Convenient re-exports for common usage.
//!
//! ```ignore
//! use procwatch::prelude::*;
//! ```

pub use crate::action::{Action, ActionArgs, ActionRegistry, FnAction, LogAction};
pub use crate::config::rules::{RuleSpec, RulesFile};
pub use crate::config::{LineEnding, SupervisorConfig};
pub use crate::engine::{EngineStats, RuleEngine};
pub use crate::error::{
    ActionError, Result, RuleCompileError, SpawnError, SupervisorError,
};
pub use crate::supervisor::Supervisor;
pub use crate::types::{Line, ProcessStatus};
