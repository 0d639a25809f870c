// src/bin/slack-session-start.rs
// SessionStart hook binary: thin wrapper reading stdin, calling
// hooks::handle_session_start, and always exiting 0 (SPEC_FULL.md §4.7.1).

use std::io::Read;

use claude_slack::config::{claude_config_dir, SlackConfig};
use claude_slack::hooks::{self, SessionStartPayload};
use claude_slack::store::Store;

#[tokio::main]
async fn main() {
    let config_dir = match claude_config_dir() {
        Ok(dir) => dir,
        Err(_) => std::process::exit(0),
    };
    let _guard = claude_slack::logging::init_hook_logging(&config_dir.join("claude-slack/logs"), "session-start");

    if let Err(err) = run(&config_dir).await {
        hooks::log_hook_error("session-start", &err);
    }
    std::process::exit(0);
}

async fn run(config_dir: &std::path::Path) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let payload: SessionStartPayload = serde_json::from_str(&input)?;

    let db_path = config_dir.join("claude-slack/data/claude-slack.db");
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store = Store::open(&format!("sqlite://{}", db_path.display())).await?;

    let config_path = config_dir.join("claude-slack/config/claude-slack.config.yaml");
    let config = SlackConfig::load(&config_path).await.unwrap_or_default();

    hooks::handle_session_start(&store, &config, config_dir, &payload).await
}
