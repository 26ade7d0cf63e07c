//! Actions and the action registry.
//!
//! An [`Action`] is the sink a matching rule dispatches its transformed
//! text to. Handlers are registered in-process, ahead of time, under a
//! name; rule descriptions reference handlers by name only, which keeps
//! the action set statically auditable. There is no dynamic loading of
//! callables.
//!
//! What a handler does with the text (print it, forward it to a queue,
//! issue an HTTP request) is outside this crate's responsibility. The
//! engine's contract is only: invoke the registered handler with the
//! text, isolate its failures.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use crate::error::ActionError;

/// Free-form arguments a rule description binds to its action.
///
/// Carried from the rule's `args` table to every invocation of the
/// resolved handler; handlers pick out the keys they understand and
/// ignore the rest.
pub type ActionArgs = HashMap<String, serde_json::Value>;

/// A handler invoked with the transformed text of a matching rule.
pub trait Action: Send + Sync {
    /// Invoke the handler with the transformed text and the rule's
    /// bound arguments.
    ///
    /// The engine bounds this future with its action timeout; a handler
    /// performing blocking I/O must be prepared to be cancelled.
    fn invoke<'a>(
        &'a self,
        text: &'a str,
        args: &'a ActionArgs,
    ) -> BoxFuture<'a, Result<(), ActionError>>;
}

/// Adapter turning an async closure into an [`Action`].
///
/// The closure receives an owned copy of the text so its future does not
/// borrow from the invocation. Rule arguments are not forwarded here;
/// a handler that consumes them implements [`Action`] directly.
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> FnAction<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    /// Wrap an async closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    fn invoke<'a>(
        &'a self,
        text: &'a str,
        _args: &'a ActionArgs,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin((self.f)(text.to_string()))
    }
}

/// The prebuilt action: log the transformed text at info level.
///
/// The template renders the payload into a larger message; every
/// occurrence of `{text}` is replaced with the transformed line. A rule
/// can override the template per binding through a `template` entry in
/// its `args`. This is the reference handler callers copy when writing
/// their own sinks.
#[derive(Debug, Clone)]
pub struct LogAction {
    template: String,
}

impl LogAction {
    /// Create a log action that emits the text as-is.
    #[must_use]
    pub fn new() -> Self {
        Self {
            template: "{text}".to_string(),
        }
    }

    /// Create a log action rendering the text into a template.
    #[must_use]
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    fn render(&self, text: &str, args: &ActionArgs) -> String {
        let template = args
            .get("template")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.template);
        template.replace("{text}", text)
    }
}

impl Default for LogAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for LogAction {
    fn invoke<'a>(
        &'a self,
        text: &'a str,
        args: &'a ActionArgs,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        let message = self.render(text, args);
        Box::pin(async move {
            info!(target: "procwatch::action", "{message}");
            Ok(())
        })
    }
}

/// In-process map from action names to handlers.
///
/// Consulted when rules are registered; an unresolved name is a
/// [`RuleCompileError`](crate::RuleCompileError) at that point, never a
/// runtime surprise.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in handlers (`log`).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("log", LogAction::new());
        registry
    }

    /// Register a handler under a name, replacing any previous handler
    /// with that name.
    pub fn register(&mut self, name: impl Into<String>, action: impl Action + 'static) {
        self.actions.insert(name.into(), Arc::new(action));
    }

    /// Register an already-shared handler under a name.
    pub fn register_arc(&mut self, name: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(name.into(), action);
    }

    /// Look up a handler by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).map(Arc::clone)
    }

    /// Check whether a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Names of all registered handlers.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn fn_action_receives_text() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let action = FnAction::new(move |text: String| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(text);
                Ok(())
            }
        });

        action.invoke("hello", &ActionArgs::new()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn fn_action_propagates_failure() {
        let action = FnAction::new(|_text: String| async { Err(ActionError::message("nope")) });
        let err = action.invoke("x", &ActionArgs::new()).await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn log_action_template_render() {
        let no_args = ActionArgs::new();
        let action = LogAction::with_template("saw: {text}!");
        assert_eq!(action.render("boom", &no_args), "saw: boom!");

        let plain = LogAction::new();
        assert_eq!(plain.render("boom", &no_args), "boom");
    }

    #[test]
    fn log_action_template_overridden_by_args() {
        let args = ActionArgs::from([(
            "template".to_string(),
            serde_json::json!("alert: {text}"),
        )]);
        let action = LogAction::with_template("ignored {text}");
        assert_eq!(action.render("disk full", &args), "alert: disk full");

        // A non-string template entry falls back to the handler's own.
        let bad = ActionArgs::from([("template".to_string(), serde_json::json!(7))]);
        assert_eq!(action.render("x", &bad), "ignored x");
    }

    #[tokio::test]
    async fn log_action_invoke_succeeds() {
        LogAction::new()
            .invoke("anything", &ActionArgs::new())
            .await
            .unwrap();
    }

    #[test]
    fn registry_lookup() {
        let mut registry = ActionRegistry::new();
        assert!(registry.is_empty());
        registry.register("print", LogAction::new());

        assert!(registry.contains("print"));
        assert!(registry.get("print").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_builtins_include_log() {
        let registry = ActionRegistry::with_builtins();
        assert!(registry.contains("log"));
    }

    #[test]
    fn registry_replaces_on_rename() {
        let mut registry = ActionRegistry::new();
        registry.register("a", LogAction::new());
        registry.register("a", LogAction::with_template("x{text}"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_shares_one_handler_between_names() {
        let handler: Arc<dyn Action> = Arc::new(LogAction::new());
        let mut registry = ActionRegistry::new();
        registry.register_arc("warn", Arc::clone(&handler));
        registry.register_arc("alert", handler);

        let a = registry.get("warn").unwrap();
        let b = registry.get("alert").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
