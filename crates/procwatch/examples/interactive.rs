//! Drive a child's stdin and read its output back.
//!
//! Run with: `cargo run --example interactive`

use procwatch::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let config = SupervisorConfig::new("/bin/cat")
        .manage_input(true)
        .line_ending(LineEnding::Lf);
    let mut supervisor = Supervisor::spawn(config)?;

    supervisor.write("hello")?;
    supervisor.write("world")?;

    for _ in 0..2 {
        if let Some(line) = supervisor.read().await? {
            print!("echoed: {line}");
        }
    }

    let status = supervisor.shutdown().await?;
    println!("child {status}");
    Ok(())
}
