// src/bin/slack-pre-tool-use.rs
// PreToolUse hook binary: thin wrapper reading stdin, calling
// hooks::handle_pre_tool_use, and always exiting 0 (SPEC_FULL.md §4.7.1).

use std::io::Read;

use claude_slack::config::claude_config_dir;
use claude_slack::hooks::{self, PreToolUsePayload};
use claude_slack::store::Store;

#[tokio::main]
async fn main() {
    let config_dir = match claude_config_dir() {
        Ok(dir) => dir,
        Err(_) => std::process::exit(0),
    };
    let _guard = claude_slack::logging::init_hook_logging(&config_dir.join("claude-slack/logs"), "pre-tool-use");

    if let Err(err) = run(&config_dir).await {
        hooks::log_hook_error("pre-tool-use", &err);
    }
    std::process::exit(0);
}

async fn run(config_dir: &std::path::Path) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let payload: PreToolUsePayload = serde_json::from_str(&input)?;

    let db_path = config_dir.join("claude-slack/data/claude-slack.db");
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store = Store::open(&format!("sqlite://{}", db_path.display())).await?;

    hooks::handle_pre_tool_use(&store, config_dir, &payload).await
}
