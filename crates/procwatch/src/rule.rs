//! A single condition → transform → dispatch unit.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::action::{Action, ActionArgs, ActionRegistry};
use crate::config::rules::RuleSpec;
use crate::error::{ActionError, RuleCompileError};

/// The result of evaluating one rule against one line.
#[derive(Debug)]
pub struct Evaluation {
    /// Whether the condition matched, independent of action success.
    pub matched: bool,

    /// The text handed to the action, if the condition matched.
    pub transformed: Option<String>,

    /// The action's outcome, if it was invoked.
    pub action_result: Option<Result<(), ActionError>>,

    /// How many removal passes produced no change (a rule-authoring
    /// diagnostic, not an error).
    pub idle_removals: usize,
}

impl Evaluation {
    const fn no_match() -> Self {
        Self {
            matched: false,
            transformed: None,
            action_result: None,
            idle_removals: 0,
        }
    }
}

/// A compiled rule: a condition pattern, an ordered list of removal
/// patterns, and a bound action.
///
/// Immutable after registration. Rules do not own the lines they are
/// evaluated against.
pub struct Rule {
    name: String,
    condition: Regex,
    removals: Vec<Regex>,
    action: Arc<dyn Action>,
    args: ActionArgs,
}

impl Rule {
    /// Build a rule from already-compiled parts, with no action
    /// arguments.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        condition: Regex,
        removals: Vec<Regex>,
        action: Arc<dyn Action>,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            removals,
            action,
            args: ActionArgs::new(),
        }
    }

    /// Set the arguments passed to the action on every dispatch.
    #[must_use]
    pub fn args(mut self, args: ActionArgs) -> Self {
        self.args = args;
        self
    }

    /// Compile a declarative description, resolving its action against
    /// the registry.
    pub fn compile(
        name: impl Into<String>,
        spec: &RuleSpec,
        registry: &ActionRegistry,
    ) -> Result<Self, RuleCompileError> {
        let name = name.into();
        let condition =
            Regex::new(&spec.condition).map_err(|source| RuleCompileError::BadCondition {
                rule: name.clone(),
                source,
            })?;
        let removals = spec
            .remove_patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| {
                Regex::new(pattern).map_err(|source| RuleCompileError::BadRemoval {
                    rule: name.clone(),
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let action = registry
            .get(&spec.action)
            .ok_or_else(|| RuleCompileError::UnknownAction {
                rule: name.clone(),
                action: spec.action.clone(),
            })?;

        Ok(Self::new(name, condition, removals, action).args(spec.args.clone()))
    }

    /// The rule's name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The condition pattern source.
    #[must_use]
    pub fn condition(&self) -> &str {
        self.condition.as_str()
    }

    /// Check the condition without transforming or dispatching.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.condition.is_match(text)
    }

    /// Apply the removal passes to already-matched text.
    ///
    /// Each pass substitutes every match of its pattern with the empty
    /// string, operating on the output of the previous pass. Returns the
    /// final text and the number of passes that changed nothing.
    #[must_use]
    pub fn transform(&self, text: &str) -> (String, usize) {
        let mut current = text.to_string();
        let mut idle = 0;
        for (index, removal) in self.removals.iter().enumerate() {
            let replaced = removal.replace_all(&current, "");
            if replaced == current {
                warn!(
                    rule = %self.name,
                    pattern = removal.as_str(),
                    index,
                    "removal pattern had no effect"
                );
                idle += 1;
            }
            current = replaced.into_owned();
        }
        (current, idle)
    }

    /// Evaluate the rule against one line of text.
    ///
    /// Tests the condition; on a match, runs the removal passes and
    /// invokes the action with the final text, bounded by
    /// `action_timeout`. The returned [`Evaluation`] reports whether the
    /// condition matched independently of whether the action succeeded.
    pub async fn evaluate(&self, text: &str, action_timeout: Duration) -> Evaluation {
        if !self.matches(text) {
            return Evaluation::no_match();
        }

        let (transformed, idle_removals) = self.transform(text);
        debug!(rule = %self.name, text = %transformed, "rule fired");

        let dispatch = self.action.invoke(&transformed, &self.args);
        let action_result = match tokio::time::timeout(action_timeout, dispatch).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::TimedOut {
                duration: action_timeout,
            }),
        };

        Evaluation {
            matched: true,
            transformed: Some(transformed),
            action_result: Some(action_result),
            idle_removals,
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("condition", &self.condition.as_str())
            .field("removals", &self.removals.len())
            .finish()
    }
}
