// src/logging.rs
// tracing-subscriber setup, grounded on backend/src/main.rs's FmtSubscriber
// idiom, split into a stdout variant (WriterService) and a file variant
// (hook binaries, which must never write to stdout/stderr).

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    let debug = std::env::var("CLAUDE_SLACK_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize logging for the long-running WriterService: human-readable
/// output on stdout.
pub fn init_service_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .init();
}

/// Initialize logging for a short-lived hook binary: JSON lines appended to
/// a rotating file under the logs directory, never to stdout (stdout/stderr
/// are reserved for the hook's own output contract with the host).
///
/// Returns a guard that must be kept alive for the duration of `main`.
pub fn init_hook_logging(logs_dir: &PathBuf, component: &str) -> WorkerGuard {
    let _ = std::fs::create_dir_all(logs_dir);
    let file_appender = tracing_appender::rolling::daily(logs_dir, format!("{component}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(non_blocking)
        .with_ansi(false)
        .json()
        .init();

    guard
}
