mod applicants;
mod assignment;
mod config;
mod db;
mod error;
mod ipc;
mod models;
mod personnel;
mod placeholder;
mod position_key;
mod reconcile;
mod stats;
mod store;
mod succession_index;
mod transactions;
mod vacancy_sync;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SUCCESSIOND_LOG";

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn write_line(value: &serde_json::Value) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn main() {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "successiond starting");

    let progress: ipc::ProgressSink = Box::new(|line| write_line(&line));
    let mut state = ipc::AppState::new(Some(progress));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                write_line(&serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        write_line(&resp);
    }
    tracing::info!("stdin closed, exiting");
}
