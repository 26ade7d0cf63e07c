//! The rule engine: an ordered rule collection evaluated against every
//! incoming line.
//!
//! Evaluation never short-circuits: every registered rule sees every
//! line, in registration order, and multiple rules may fire on the same
//! line. A failing or timed-out action is caught, logged, and counted;
//! it never aborts evaluation of the remaining rules or lines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::action::ActionRegistry;
use crate::config::DEFAULT_ACTION_TIMEOUT;
use crate::config::rules::RuleSpec;
use crate::error::RuleCompileError;
use crate::rule::Rule;
use crate::supervisor::Supervisor;
use crate::types::Line;

/// Snapshot of the engine's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Lines handed to `evaluate`.
    pub lines_evaluated: u64,

    /// Rule firings (condition matches).
    pub rules_fired: u64,

    /// Actions that failed or timed out.
    pub action_failures: u64,

    /// Removal passes that produced no change.
    pub removals_without_effect: u64,
}

#[derive(Debug, Default)]
struct Counters {
    lines_evaluated: AtomicU64,
    rules_fired: AtomicU64,
    action_failures: AtomicU64,
    removals_without_effect: AtomicU64,
}

/// Holds an ordered set of compiled rules and dispatches lines to them.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    registry: ActionRegistry,
    action_timeout: Duration,
    counters: Counters,
}

impl RuleEngine {
    /// Create an engine resolving actions against the given registry.
    #[must_use]
    pub fn new(registry: ActionRegistry) -> Self {
        Self {
            rules: Vec::new(),
            registry,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            counters: Counters::default(),
        }
    }

    /// Bound each action invocation with the given timeout.
    #[must_use]
    pub const fn action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// The registry actions are resolved against.
    #[must_use]
    pub const fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check whether no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The registered rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Compile and register one rule description.
    ///
    /// Unnamed descriptions are given a positional name. Registration
    /// order is evaluation order.
    pub fn register(&mut self, spec: &RuleSpec) -> Result<(), RuleCompileError> {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| format!("rule-{}", self.rules.len()));
        let rule = Rule::compile(name, spec, &self.registry)?;
        debug!(rule = rule.name(), condition = rule.condition(), "registered rule");
        self.rules.push(rule);
        Ok(())
    }

    /// Register a batch of descriptions, continuing past individual
    /// failures.
    ///
    /// Every failure is returned together with the spec that caused it;
    /// descriptions that compile are registered regardless.
    pub fn register_all<'a, I>(&mut self, specs: I) -> Vec<RuleCompileError>
    where
        I: IntoIterator<Item = &'a RuleSpec>,
    {
        let mut failures = Vec::new();
        for spec in specs {
            if let Err(err) = self.register(spec) {
                error!(rule = err.rule(), error = %err, "failed to register rule");
                failures.push(err);
            }
        }
        failures
    }

    /// Evaluate one line against every registered rule, in registration
    /// order.
    ///
    /// The line's terminator is stripped before matching so anchored
    /// conditions behave as rule authors expect. Action failures are
    /// logged and counted here; they do not stop later rules from seeing
    /// the line. Returns the number of rules that fired.
    pub async fn evaluate(&self, line: &Line) -> usize {
        self.counters.lines_evaluated.fetch_add(1, Ordering::Relaxed);
        let text = line.text_trimmed();

        let mut fired = 0;
        for rule in &self.rules {
            let ev = rule.evaluate(&text, self.action_timeout).await;
            if !ev.matched {
                continue;
            }
            fired += 1;
            self.counters.rules_fired.fetch_add(1, Ordering::Relaxed);
            self.counters
                .removals_without_effect
                .fetch_add(ev.idle_removals as u64, Ordering::Relaxed);
            if let Some(Err(err)) = ev.action_result {
                self.counters.action_failures.fetch_add(1, Ordering::Relaxed);
                error!(rule = rule.name(), error = %err, "rule action failed");
            }
        }
        fired
    }

    /// Drive a supervisor's output to end-of-stream, evaluating every
    /// line.
    ///
    /// Returns the engine's statistics once the output channel reports
    /// end-of-stream.
    pub async fn run(&self, supervisor: &mut Supervisor) -> crate::error::Result<EngineStats> {
        info!(rules = self.rules.len(), "rule engine running");
        while let Some(line) = supervisor.read().await? {
            self.evaluate(&line).await;
        }
        let stats = self.stats();
        info!(
            lines = stats.lines_evaluated,
            fired = stats.rules_fired,
            failures = stats.action_failures,
            "rule engine finished"
        );
        Ok(stats)
    }

    /// Snapshot the engine's counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            lines_evaluated: self.counters.lines_evaluated.load(Ordering::Relaxed),
            rules_fired: self.counters.rules_fired.load(Ordering::Relaxed),
            action_failures: self.counters.action_failures.load(Ordering::Relaxed),
            removals_without_effect: self
                .counters
                .removals_without_effect
                .load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::FnAction;
    use crate::error::ActionError;
    use std::sync::{Arc, Mutex};

    fn registry_with_capture() -> (Arc<Mutex<Vec<String>>>, ActionRegistry) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionRegistry::with_builtins();

        let sink = Arc::clone(&seen);
        registry.register(
            "capture",
            FnAction::new(move |text: String| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(text);
                    Ok(())
                }
            }),
        );
        registry.register(
            "explode",
            FnAction::new(|_text: String| async { Err(ActionError::message("down")) }),
        );
        (seen, registry)
    }

    #[tokio::test]
    async fn all_matching_rules_fire_in_order() {
        let (seen, mut registry) = registry_with_capture();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            registry.register(
                tag,
                FnAction::new(move |_text: String| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(tag);
                        Ok(())
                    }
                }),
            );
        }

        let mut engine = RuleEngine::new(registry);
        engine.register(&RuleSpec::new("match", "first")).unwrap();
        engine.register(&RuleSpec::new("match", "second")).unwrap();

        let fired = engine.evaluate(&Line::from("a match here\n")).await;
        assert_eq!(fired, 2);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        drop(seen);
    }

    #[tokio::test]
    async fn action_failure_does_not_stop_later_rules() {
        let (seen, registry) = registry_with_capture();
        let mut engine = RuleEngine::new(registry);
        engine
            .register(&RuleSpec::new("boom", "explode").name("bad"))
            .unwrap();
        engine
            .register(&RuleSpec::new("boom", "capture").name("good"))
            .unwrap();

        let fired = engine.evaluate(&Line::from("boom\n")).await;
        assert_eq!(fired, 2);
        assert_eq!(*seen.lock().unwrap(), vec!["boom".to_string()]);

        let stats = engine.stats();
        assert_eq!(stats.lines_evaluated, 1);
        assert_eq!(stats.rules_fired, 2);
        assert_eq!(stats.action_failures, 1);
    }

    #[tokio::test]
    async fn anchored_conditions_see_trimmed_text() {
        let (seen, registry) = registry_with_capture();
        let mut engine = RuleEngine::new(registry);
        engine
            .register(&RuleSpec::new(r"found$", "capture"))
            .unwrap();

        // Anchors must not be defeated by the wire terminator.
        let fired = engine.evaluate(&Line::from("not found\r\n")).await;
        assert_eq!(fired, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["not found".to_string()]);
    }

    #[tokio::test]
    async fn idle_removals_are_observable() {
        let (_seen, registry) = registry_with_capture();
        let mut engine = RuleEngine::new(registry);
        engine
            .register(&RuleSpec::new("x", "capture").remove("never-there"))
            .unwrap();

        engine.evaluate(&Line::from("x\n")).await;
        assert_eq!(engine.stats().removals_without_effect, 1);
    }

    #[tokio::test]
    async fn error_rule_strips_digits_through_the_engine() {
        let (seen, registry) = registry_with_capture();
        let mut engine = RuleEngine::new(registry);
        engine
            .register(&RuleSpec::new("^ERROR", "capture").remove(r"\d+"))
            .unwrap();

        let fired = engine.evaluate(&Line::from("ERROR 404 not found\n")).await;
        assert_eq!(fired, 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["ERROR  not found".to_string()]
        );
    }

    #[test]
    fn register_all_continues_past_failures() {
        let (_seen, registry) = registry_with_capture();
        let mut engine = RuleEngine::new(registry);
        let specs = vec![
            RuleSpec::new("ok1", "capture").name("good-one"),
            RuleSpec::new("[broken", "capture").name("bad-pattern"),
            RuleSpec::new("ok2", "nonexistent").name("bad-action"),
            RuleSpec::new("ok3", "capture").name("good-two"),
        ];

        let failures = engine.register_all(&specs);
        assert_eq!(engine.len(), 2);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].rule(), "bad-pattern");
        assert_eq!(failures[1].rule(), "bad-action");
    }

    #[test]
    fn unnamed_rules_get_positional_names() {
        let (_seen, registry) = registry_with_capture();
        let mut engine = RuleEngine::new(registry);
        engine.register(&RuleSpec::new("a", "capture")).unwrap();
        engine.register(&RuleSpec::new("b", "capture")).unwrap();
        assert_eq!(engine.rules()[0].name(), "rule-0");
        assert_eq!(engine.rules()[1].name(), "rule-1");
    }
}
