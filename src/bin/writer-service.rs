// src/bin/writer-service.rs
// Entry point for the WriterService: the long-running HTTP front door that
// makes the embedded store a single-writer system (SPEC_FULL.md §4.6.1).
// Grounded on backend/src/main.rs's axum::serve setup.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use claude_slack::config::{claude_config_dir, SlackConfig};
use claude_slack::store::Store;
use claude_slack::writer_service::{router, AppState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "claude-slack-writer", about = "Claude-Slack WriterService")]
struct Args {
    #[arg(long, env = "CLAUDE_SLACK_BIND", default_value = "127.0.0.1:8787")]
    bind: String,

    #[arg(long, env = "CLAUDE_SLACK_DB_PATH")]
    db_path: Option<String>,

    #[arg(long, env = "CLAUDE_SLACK_CONFIG_PATH")]
    config_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    claude_slack::logging::init_service_logging();
    let args = Args::parse();

    let config_dir = claude_config_dir()?;
    let db_path = args
        .db_path
        .unwrap_or_else(|| config_dir.join("claude-slack/data/claude-slack.db").to_string_lossy().to_string());
    let config_path = args
        .config_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| config_dir.join("claude-slack/config/claude-slack.config.yaml"));

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store = Store::open(&format!("sqlite://{db_path}")).await?;
    let config = match SlackConfig::load(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(%e, "could not load config file; using defaults");
            SlackConfig::default()
        }
    };

    let retention_days = config.settings.message_retention_days;
    let retention_store = store.clone();
    tokio::spawn(async move {
        claude_slack::messaging::retention::run_retention_loop(
            retention_store,
            retention_days,
            Duration::from_secs(3600),
        )
        .await;
    });

    let state = Arc::new(AppState::new(store, config));
    let app = router(state);

    info!(bind = %args.bind, "starting claude-slack writer service");
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
