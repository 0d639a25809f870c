// src/hooks/mod.rs
// Core logic for the two hook binaries, factored out of main() so it is
// unit-testable without a subprocess (SPEC_FULL.md §4.7.1). Grounded on
// original_source's slack_session_start.py / slack_pre_tool_use.py for
// payload shape and the "always exit 0" contract, and on
// backend/src/checkpoint/mod.rs's use of sha2 for the hashing idiom.

pub mod project;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, warn};

use crate::config::SlackConfig;
use crate::identity::IdentityModel;
use crate::reconciler::{self, DesiredState};
use crate::store::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartPayload {
    pub session_id: String,
    pub cwd: String,
    pub hook_event_name: String,
    pub transcript_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreToolUsePayload {
    pub session_id: String,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub cwd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingToolCall {
    session_id: String,
    tool_name: String,
    tool_inputs_hash: String,
    tool_inputs: serde_json::Value,
    created_at: i64,
}

const CLAUDE_SLACK_TOOL_PREFIX: &str = "mcp__claude-slack__";

fn is_claude_slack_tool(tool_name: &str) -> bool {
    tool_name.starts_with(CLAUDE_SLACK_TOOL_PREFIX)
}

/// `hex(SHA-256(canonical_json))[..16]`. Canonical JSON means object keys
/// sorted, matching the Python original's `json.dumps(..., sort_keys=True)`.
pub fn tool_inputs_hash(tool_input: &serde_json::Value) -> String {
    let canonical = canonical_json(tool_input);
    let digest = Sha256::digest(canonical.as_bytes());
    crate::identity::hex_prefix(&digest, 16)
}

fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", serde_json::to_string(k).unwrap(), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

fn pending_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("claude-slack").join("sessions").join("pending")
}

/// Run the session-start hook's core logic. Never returns an error to the
/// caller in the hook-binary sense; `main` discards the Result and always
/// exits 0, but tests can assert on it directly.
pub async fn handle_session_start(
    store: &Store,
    config: &SlackConfig,
    config_dir: &Path,
    payload: &SessionStartPayload,
) -> anyhow::Result<()> {
    if payload.hook_event_name != "SessionStart" {
        return Ok(());
    }

    let project_root = project::resolve_project_root(Path::new(&payload.cwd));
    let identity = IdentityModel::new(store);

    let project_id = match &project_root {
        Some(root) => {
            let path = root.to_string_lossy().to_string();
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.clone());
            Some(identity.register_project(&path, &name).await?)
        }
        None => None,
    };

    identity
        .register_session(&payload.session_id, project_id.as_deref(), payload.transcript_path.as_deref())
        .await?;

    reingest_pending_tool_calls(store, config_dir).await;

    let desired = build_desired_state(config, config_dir, project_root.as_deref(), project_id.as_deref()).await?;
    let plan = reconciler::build_plan(store, &desired, None).await?;
    reconciler::execute_plan(store, plan).await;

    if let Some(pid) = &project_id {
        let plan = reconciler::build_plan(store, &desired, Some(pid)).await?;
        reconciler::execute_plan(store, plan).await;
    }

    Ok(())
}

async fn build_desired_state(
    config: &SlackConfig,
    config_dir: &Path,
    project_root: Option<&Path>,
    project_id: Option<&str>,
) -> anyhow::Result<DesiredState> {
    let mut agents = reconciler::discover_agents(&config_dir.join("agents"), None).await?;
    if let (Some(root), Some(pid)) = (project_root, project_id) {
        let mut project_agents = reconciler::discover_agents(&root.join(".claude").join("agents"), Some(pid)).await?;
        agents.append(&mut project_agents);
    }
    Ok(DesiredState::new(config.clone(), agents))
}

/// Re-ingest fallback files written by a prior PreToolUse invocation that
/// found the writer lock busy. Deletes each file on successful insert;
/// leaves (and warns about) files that fail.
async fn reingest_pending_tool_calls(store: &Store, config_dir: &Path) {
    let dir = pending_dir(config_dir);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(e) => e,
        Err(_) => return,
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                warn!(?path, %e, "could not read pending tool call file");
                continue;
            }
        };
        let pending: PendingToolCall = match serde_json::from_str(&contents) {
            Ok(p) => p,
            Err(e) => {
                warn!(?path, %e, "malformed pending tool call file");
                continue;
            }
        };

        let result = store
            .writer_txn(move |mut txn| async move {
                sqlx::query(
                    "INSERT INTO tool_calls (session_id, tool_name, tool_inputs_hash, tool_inputs, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&pending.session_id)
                .bind(&pending.tool_name)
                .bind(&pending.tool_inputs_hash)
                .bind(pending.tool_inputs.to_string())
                .bind(pending.created_at)
                .execute(&mut *txn)
                .await?;
                sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
                    .bind(pending.created_at)
                    .bind(&pending.session_id)
                    .execute(&mut *txn)
                    .await?;
                Ok((txn, ()))
            })
            .await;

        match result {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(?path, %e, "could not delete re-ingested pending tool call file");
                }
            }
            Err(e) => warn!(?path, %e, "failed to re-ingest pending tool call; will retry next session start"),
        }
    }
}

/// Run the pre-tool-use hook's core logic.
pub async fn handle_pre_tool_use(store: &Store, config_dir: &Path, payload: &PreToolUsePayload) -> anyhow::Result<()> {
    if !is_claude_slack_tool(&payload.tool_name) {
        return Ok(());
    }

    let hash = tool_inputs_hash(&payload.tool_input);
    let ts = chrono::Utc::now().timestamp();
    let session_id = payload.session_id.clone();
    let tool_name = payload.tool_name.clone();
    let tool_input = payload.tool_input.clone();

    let result = store
        .writer_txn(move |mut txn| async move {
            sqlx::query(
                "INSERT INTO tool_calls (session_id, tool_name, tool_inputs_hash, tool_inputs, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&session_id)
            .bind(&tool_name)
            .bind(&hash)
            .bind(tool_input.to_string())
            .bind(ts)
            .execute(&mut *txn)
            .await?;
            sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
                .bind(ts)
                .bind(&session_id)
                .execute(&mut *txn)
                .await?;
            Ok((txn, ()))
        })
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(crate::error::DomainError::StoreBusy) => {
            write_pending_fallback(config_dir, payload, &hash, ts).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_pending_fallback(
    config_dir: &Path,
    payload: &PreToolUsePayload,
    hash: &str,
    ts: i64,
) -> anyhow::Result<()> {
    let dir = pending_dir(config_dir);
    tokio::fs::create_dir_all(&dir).await?;

    let suffix = format!("{ts:016x}");
    let path = dir.join(format!("{}-{}.json", payload.session_id, suffix));

    let pending = PendingToolCall {
        session_id: payload.session_id.clone(),
        tool_name: payload.tool_name.clone(),
        tool_inputs_hash: hash.to_string(),
        tool_inputs: payload.tool_input.clone(),
        created_at: ts,
    };
    let json = serde_json::to_string(&pending)?;
    tokio::fs::write(&path, json).await?;
    Ok(())
}

/// Log an error from a hook's core logic without propagating it; the host
/// contract requires the process to exit 0 regardless.
pub fn log_hook_error(component: &str, err: &anyhow::Error) {
    error!(component, %err, "hook failed; swallowing per host contract");
}
