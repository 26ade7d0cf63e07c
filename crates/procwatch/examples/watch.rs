//! Watch a shell command and react to its error lines.
//!
//! Run with: `cargo run --example watch`

use procwatch::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut registry = ActionRegistry::with_builtins();
    registry.register(
        "announce",
        FnAction::new(|text: String| async move {
            println!(">> rule fired: {text}");
            Ok(())
        }),
    );

    let mut engine = RuleEngine::new(registry);
    engine
        .register(
            &RuleSpec::new("^ERROR", "announce")
                .name("errors")
                .remove(r"\d+"),
        )
        .expect("valid rule");
    engine
        .register(&RuleSpec::new("^WARN", "log").name("warnings"))
        .expect("valid rule");

    let script = "echo 'INFO starting up'; \
                  echo 'WARN low disk space'; \
                  echo 'ERROR 503 backend unavailable'; \
                  echo 'INFO shutting down'";
    let mut supervisor = Supervisor::spawn(SupervisorConfig::shell(script))?;

    let stats = engine.run(&mut supervisor).await?;
    println!(
        "evaluated {} lines, {} rules fired, {} action failures",
        stats.lines_evaluated, stats.rules_fired, stats.action_failures
    );

    let status = supervisor.wait().await?;
    println!("child {status}");
    Ok(())
}
