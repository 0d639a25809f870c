// src/identity/mod.rs
// Projects, agents, sessions: registration and lookup (spec §4.2).
// Grounded on examples/ConaryLabs-Mira's backend/src/project/store.rs for
// the create/get-by-id CRUD shape over a shared SqlitePool.

use sha2::{Digest, Sha256};
use sqlx::Row;

use crate::error::{DomainError, DomainResult};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl AgentStatus {
    fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "inactive" => AgentStatus::Inactive,
            _ => AgentStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DmPolicy {
    Open,
    Restricted,
    Closed,
}

impl DmPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DmPolicy::Open => "open",
            DmPolicy::Restricted => "restricted",
            DmPolicy::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "restricted" => DmPolicy::Restricted,
            "closed" => DmPolicy::Closed,
            _ => DmPolicy::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Discoverable {
    Public,
    Project,
    Private,
}

impl Discoverable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discoverable::Public => "public",
            Discoverable::Project => "project",
            Discoverable::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "project" => Discoverable::Project,
            "private" => Discoverable::Private,
            _ => Discoverable::Public,
        }
    }
}

/// An agent's `(name, project_id)` identity key. `project_id = None` means
/// a global agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AgentKey {
    pub name: String,
    pub project_id: Option<String>,
}

impl AgentKey {
    pub fn new(name: impl Into<String>, project_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            project_id,
        }
    }

    /// Render per the `AGENT_KEY := NAME ("@" HEX32)?` grammar of spec §6.
    pub fn render(&self) -> String {
        match &self.project_id {
            Some(pid) => format!("{}@{}", self.name, pid),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub id: String,
    pub path: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Agent {
    pub name: String,
    pub project_id: Option<String>,
    pub description: Option<String>,
    pub status: AgentStatus,
    pub dm_policy: DmPolicy,
    pub discoverable: Discoverable,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub id: String,
    pub project_id: Option<String>,
    pub transcript_path: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Compute the stable 128-bit project id: first 32 hex chars of
/// SHA-256(absolute_path).
pub fn project_id_for_path(absolute_path: &str) -> String {
    let digest = Sha256::digest(absolute_path.as_bytes());
    hex_prefix(&digest, 32)
}

pub(crate) fn hex_prefix(bytes: &[u8], len: usize) -> String {
    let mut s = String::with_capacity(len);
    for b in bytes {
        if s.len() >= len {
            break;
        }
        s.push_str(&format!("{b:02x}"));
    }
    s.truncate(len);
    s
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct IdentityModel<'a> {
    store: &'a Store,
}

impl<'a> IdentityModel<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Idempotent: inserts if absent, otherwise leaves the existing row
    /// untouched (Project is immutable after creation per spec §3).
    pub async fn register_project(&self, absolute_path: &str, name: &str) -> DomainResult<String> {
        let id = project_id_for_path(absolute_path);
        let ts = now();
        self.store
            .writer_txn(move |mut txn| {
                let id = id.clone();
                let path = absolute_path.to_string();
                let name = name.to_string();
                async move {
                    sqlx::query(
                        "INSERT INTO projects (id, path, name, created_at) VALUES (?, ?, ?, ?)
                         ON CONFLICT(id) DO NOTHING",
                    )
                    .bind(&id)
                    .bind(&path)
                    .bind(&name)
                    .bind(ts)
                    .execute(&mut *txn)
                    .await?;
                    Ok((txn, id))
                }
            })
            .await
    }

    pub async fn get_project(&self, id: &str) -> DomainResult<Option<Project>> {
        let row = sqlx::query("SELECT id, path, name, created_at FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(self.store.reader_conn())
            .await?;
        Ok(row.map(|r| Project {
            id: r.get("id"),
            path: r.get("path"),
            name: r.get("name"),
            created_at: r.get("created_at"),
        }))
    }

    /// Idempotent: updates `description` on re-registration; never
    /// downgrades `status` (an explicit `inactive -> active` re-registration
    /// is allowed; we simply never set status back to inactive here, since
    /// only an explicit deactivation path — not present in the core API —
    /// would do that).
    pub async fn register_agent(
        &self,
        name: &str,
        project_id: Option<&str>,
        description: Option<&str>,
        dm_policy: DmPolicy,
        discoverable: Discoverable,
    ) -> DomainResult<()> {
        let ts = now();
        let name = name.to_string();
        let project_id = project_id.map(|s| s.to_string());
        let description = description.map(|s| s.to_string());

        self.store
            .writer_txn(move |mut txn| async move {
                let existing: Option<(String,)> = sqlx::query_as(
                    "SELECT status FROM agents WHERE name = ? AND project_id IS ?",
                )
                .bind(&name)
                .bind(&project_id)
                .fetch_optional(&mut *txn)
                .await?;

                if existing.is_some() {
                    sqlx::query(
                        "UPDATE agents SET description = ?, dm_policy = ?, discoverable = ?, updated_at = ?
                         WHERE name = ? AND project_id IS ?",
                    )
                    .bind(&description)
                    .bind(dm_policy.as_str())
                    .bind(discoverable.as_str())
                    .bind(ts)
                    .bind(&name)
                    .bind(&project_id)
                    .execute(&mut *txn)
                    .await?;
                } else {
                    sqlx::query(
                        "INSERT INTO agents (name, project_id, description, status, dm_policy, discoverable, created_at, updated_at)
                         VALUES (?, ?, ?, 'active', ?, ?, ?, ?)",
                    )
                    .bind(&name)
                    .bind(&project_id)
                    .bind(&description)
                    .bind(dm_policy.as_str())
                    .bind(discoverable.as_str())
                    .bind(ts)
                    .bind(ts)
                    .execute(&mut *txn)
                    .await?;
                }
                Ok((txn, ()))
            })
            .await
    }

    pub async fn get_agent(&self, name: &str, project_id: Option<&str>) -> DomainResult<Option<Agent>> {
        let row = sqlx::query(
            "SELECT name, project_id, description, status, dm_policy, discoverable, created_at, updated_at
             FROM agents WHERE name = ? AND project_id IS ?",
        )
        .bind(name)
        .bind(project_id)
        .fetch_optional(self.store.reader_conn())
        .await?;
        Ok(row.map(row_to_agent))
    }

    /// List agents visible to `caller` per the discoverability rule of
    /// spec §4.2: public agents, project-scoped agents sharing (or linked
    /// to, in the right direction) the caller's project, and the caller
    /// itself.
    pub async fn list_agents(&self, caller: &AgentKey) -> DomainResult<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT name, project_id, description, status, dm_policy, discoverable, created_at, updated_at FROM agents",
        )
        .fetch_all(self.store.reader_conn())
        .await?;

        let mut visible = Vec::new();
        for row in rows {
            let agent = row_to_agent(row);
            if self.is_visible(&agent, caller).await? {
                visible.push(agent);
            }
        }
        Ok(visible)
    }

    async fn is_visible(&self, agent: &Agent, caller: &AgentKey) -> DomainResult<bool> {
        if agent.name == caller.name && agent.project_id == caller.project_id {
            return Ok(true);
        }
        match agent.discoverable {
            Discoverable::Public => Ok(true),
            Discoverable::Private => Ok(false),
            Discoverable::Project => {
                if agent.project_id == caller.project_id {
                    return Ok(true);
                }
                match (&agent.project_id, &caller.project_id) {
                    (Some(a_proj), Some(c_proj)) => {
                        self.has_link_a_to_c(a_proj, c_proj).await
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    async fn has_link_a_to_c(&self, a_proj: &str, c_proj: &str) -> DomainResult<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT direction FROM project_links WHERE (project_a = ? AND project_b = ?) OR (project_a = ? AND project_b = ?)",
        )
        .bind(a_proj)
        .bind(c_proj)
        .bind(c_proj)
        .bind(a_proj)
        .fetch_optional(self.store.reader_conn())
        .await?;

        Ok(match row {
            Some((direction,)) if direction == "bidirectional" => true,
            Some((direction,)) => {
                // Stored as (project_a, project_b); direction names which
                // way discoverability flows.
                let forward = self
                    .link_row_matches(a_proj, c_proj, &direction)
                    .await?;
                forward
            }
            None => false,
        })
    }

    async fn link_row_matches(&self, a_proj: &str, c_proj: &str, direction: &str) -> DomainResult<bool> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT project_a, project_b FROM project_links WHERE (project_a = ? AND project_b = ?) OR (project_a = ? AND project_b = ?)",
        )
        .bind(a_proj)
        .bind(c_proj)
        .bind(c_proj)
        .bind(a_proj)
        .fetch_optional(self.store.reader_conn())
        .await?;

        Ok(match row {
            Some((pa, _pb)) if pa == a_proj => direction == "a_to_b",
            Some(_) => direction == "b_to_a",
            None => false,
        })
    }

    pub async fn register_session(
        &self,
        session_id: &str,
        project_id: Option<&str>,
        transcript_path: Option<&str>,
    ) -> DomainResult<()> {
        let ts = now();
        let session_id = session_id.to_string();
        let project_id = project_id.map(|s| s.to_string());
        let transcript_path = transcript_path.map(|s| s.to_string());

        self.store
            .writer_txn(move |mut txn| async move {
                sqlx::query(
                    "INSERT INTO sessions (id, project_id, transcript_path, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        project_id = excluded.project_id,
                        transcript_path = excluded.transcript_path,
                        updated_at = excluded.updated_at",
                )
                .bind(&session_id)
                .bind(&project_id)
                .bind(&transcript_path)
                .bind(ts)
                .bind(ts)
                .execute(&mut *txn)
                .await?;
                Ok((txn, ()))
            })
            .await
    }

    pub async fn touch_session(&self, session_id: &str) -> DomainResult<()> {
        let ts = now();
        let session_id = session_id.to_string();
        self.store
            .writer_txn(move |mut txn| async move {
                sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
                    .bind(ts)
                    .bind(&session_id)
                    .execute(&mut *txn)
                    .await?;
                Ok((txn, ()))
            })
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> DomainResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, project_id, transcript_path, created_at, updated_at FROM sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(self.store.reader_conn())
        .await?;
        Ok(row.map(|r| Session {
            id: r.get("id"),
            project_id: r.get("project_id"),
            transcript_path: r.get("transcript_path"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }
}

fn row_to_agent(row: sqlx::sqlite::SqliteRow) -> Agent {
    Agent {
        name: row.get("name"),
        project_id: row.get("project_id"),
        description: row.get("description"),
        status: AgentStatus::parse(row.get::<String, _>("status").as_str()),
        dm_policy: DmPolicy::parse(row.get::<String, _>("dm_policy").as_str()),
        discoverable: Discoverable::parse(row.get::<String, _>("discoverable").as_str()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub fn agent_not_found(key: &AgentKey) -> DomainError {
    DomainError::AgentNotFound(key.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_project_is_idempotent() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let identity = IdentityModel::new(&store);
        let id1 = identity.register_project("/tmp/x", "x").await.unwrap();
        let id2 = identity.register_project("/tmp/x", "x").await.unwrap();
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 32);

        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(store.reader_conn())
            .await
            .unwrap();
        assert_eq!(rows.0, 1);
    }

    #[tokio::test]
    async fn register_agent_updates_description_without_downgrading_status() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let identity = IdentityModel::new(&store);
        identity
            .register_agent("alice", None, Some("first"), DmPolicy::Open, Discoverable::Public)
            .await
            .unwrap();
        identity
            .register_agent("alice", None, Some("second"), DmPolicy::Open, Discoverable::Public)
            .await
            .unwrap();

        let agent = identity.get_agent("alice", None).await.unwrap().unwrap();
        assert_eq!(agent.description.as_deref(), Some("second"));
        assert_eq!(agent.status, AgentStatus::Active);
    }

    #[tokio::test]
    async fn list_agents_respects_discoverability() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let identity = IdentityModel::new(&store);
        identity
            .register_agent("pub", None, None, DmPolicy::Open, Discoverable::Public)
            .await
            .unwrap();
        identity
            .register_agent("priv", None, None, DmPolicy::Open, Discoverable::Private)
            .await
            .unwrap();

        let caller = AgentKey::new("someone", None);
        let visible = identity.list_agents(&caller).await.unwrap();
        let names: Vec<_> = visible.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"pub"));
        assert!(!names.contains(&"priv"));
    }
}
