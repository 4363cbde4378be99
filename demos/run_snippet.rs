//! Run one source file on a playground execution service.
//!
//! Demonstrates:
//! - Connecting a session with keep-alive and reconnect
//! - Following state and output through session events
//! - Waiting for the run to finish
//!
//! Usage:
//!   cargo run --example run_snippet -- path/to/source.js
//!   cargo run --example run_snippet -- path/to/source.js ws://127.0.0.1:6060
//!   RUST_LOG=playground_client=debug cargo run --example run_snippet -- source.js

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use playground_client::{
    ReconnectPolicy, Result, RunState, Session, SessionEvent, session::DEFAULT_ENDPOINT,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const RUN_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: run_snippet <source-file> [endpoint]");
        std::process::exit(2);
    };
    let endpoint = args.next().unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    if let Err(e) = run(&path, &endpoint).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(path: &str, endpoint: &str) -> Result<()> {
    let source = std::fs::read_to_string(path)?;
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    let session = Session::builder()
        .endpoint(endpoint)
        .reconnect(ReconnectPolicy::default())
        .on_event(move |event| match event {
            SessionEvent::OutputAppended(text) => print!("{text}"),
            SessionEvent::StateChanged(state) => {
                eprintln!("[state] {state}");
                if state.run == RunState::ReadyToRun || !state.connection.is_open() {
                    let _ = done_tx.send(state);
                }
            }
            SessionEvent::RunRejected(reason) => eprintln!("[rejected] {reason}"),
            _ => {}
        })
        .connect()
        .await?;

    // Open is delivered by the pump; wait for the command to become usable.
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while !session.command().enabled {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    session.run(&source)?;

    match tokio::time::timeout(RUN_TIMEOUT, done_rx.recv()).await {
        Ok(Some(state)) => eprintln!("[done] {state}"),
        Ok(None) => eprintln!("[done] session ended"),
        Err(_) => eprintln!("[timeout] no ready after {}s", RUN_TIMEOUT.as_secs()),
    }

    session.close();
    Ok(())
}
