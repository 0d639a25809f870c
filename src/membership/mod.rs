// src/membership/mod.rs
// Channels and channel membership: creation, join/leave/invite, DM policy
// enforcement, notes channels (spec §4.3/§3). Grounded on the CRUD idiom of
// examples/ConaryLabs-Mira's backend/src/memory/storage/sqlite/core.rs,
// generalized to the unified channel model.

pub mod id;

use sqlx::Row;

use crate::error::{DomainError, DomainResult};
use crate::identity::{AgentKey, DmPolicy, IdentityModel};
use crate::store::Store;

pub use id::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Standard,
    Dm,
    Notes,
}

impl ChannelType {
    fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Standard => "standard",
            ChannelType::Dm => "dm",
            ChannelType::Notes => "notes",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "dm" => ChannelType::Dm,
            "notes" => ChannelType::Notes,
            _ => ChannelType::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Open,
    Members,
    Private,
}

impl AccessType {
    fn as_str(&self) -> &'static str {
        match self {
            AccessType::Open => "open",
            AccessType::Members => "members",
            AccessType::Private => "private",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "members" => AccessType::Members,
            "private" => AccessType::Private,
            _ => AccessType::Open,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Channel {
    pub id: String,
    pub channel_type: ChannelType,
    pub access_type: AccessType,
    pub scope: String,
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub is_default: bool,
    pub archived: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ChannelMember {
    pub channel_id: String,
    pub agent_name: String,
    pub agent_project_id: Option<String>,
    pub invited_by: String,
    pub source: String,
    pub can_leave: bool,
    pub can_send: bool,
    pub can_invite: bool,
    pub can_manage: bool,
    pub is_from_default: bool,
    pub is_muted: bool,
    pub joined_at: i64,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct MembershipModel<'a> {
    store: &'a Store,
}

impl<'a> MembershipModel<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn get_channel(&self, id: &str) -> DomainResult<Option<Channel>> {
        let row = sqlx::query(
            "SELECT id, channel_type, access_type, scope, project_id, name, description,
                    created_by, is_default, archived, created_at
             FROM channels WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.store.reader_conn())
        .await?;
        Ok(row.map(row_to_channel))
    }

    /// Create a standard channel. Fails with `Duplicate` if `(scope,
    /// project_id, name)` collides — that triple is exactly what `id`
    /// encodes, so a primary-key clash on `id` is the collision (spec
    /// §4.3). `is_default` requires `access_type=open` (spec §3).
    pub async fn create_channel(
        &self,
        id: &ChannelId,
        access_type: AccessType,
        project_id: Option<&str>,
        name: &str,
        description: Option<&str>,
        created_by: &str,
        is_default: bool,
    ) -> DomainResult<String> {
        if is_default && access_type != AccessType::Open {
            return Err(DomainError::Invalid(
                "is_default requires access_type=open".into(),
            ));
        }

        let rendered = id.render();
        let scope = id.scope().to_string();
        let project_id = project_id.map(|s| s.to_string());
        let name = name.to_string();
        let description = description.map(|s| s.to_string());
        let created_by = created_by.to_string();
        let ts = now();

        self.store
            .writer_txn(move |mut txn| {
                let rendered = rendered.clone();
                async move {
                    sqlx::query(
                        "INSERT INTO channels (id, channel_type, access_type, scope, project_id, name,
                            description, created_by, is_default, archived, created_at)
                         VALUES (?, 'standard', ?, ?, ?, ?, ?, ?, ?, 0, ?)",
                    )
                    .bind(&rendered)
                    .bind(access_type.as_str())
                    .bind(&scope)
                    .bind(&project_id)
                    .bind(&name)
                    .bind(&description)
                    .bind(&created_by)
                    .bind(is_default)
                    .bind(ts)
                    .execute(&mut *txn)
                    .await?;

                    add_member_txn(
                        &mut txn,
                        &rendered,
                        &created_by,
                        None,
                        &created_by,
                        "explicit",
                        true,
                        true,
                        true,
                        true,
                        false,
                        ts,
                    )
                    .await?;

                    Ok((txn, rendered))
                }
            })
            .await
    }

    /// Get or create the `notes:<agent>` channel for `agent`. Notes
    /// channels are private and single-member; creating one for another
    /// agent is a programmer error caught by the caller, not here.
    pub async fn ensure_notes_channel(&self, agent: &AgentKey) -> DomainResult<String> {
        let id = ChannelId::notes(agent).render();
        if self.get_channel(&id).await?.is_some() {
            return Ok(id);
        }

        let agent_name = agent.name.clone();
        let agent_project_id = agent.project_id.clone();
        let rendered = id.clone();
        let ts = now();

        self.store
            .writer_txn(move |mut txn| {
                let rendered = rendered.clone();
                async move {
                    sqlx::query(
                        "INSERT INTO channels (id, channel_type, access_type, scope, project_id, name,
                            description, created_by, is_default, archived, created_at)
                         VALUES (?, 'notes', 'private', 'notes', ?, NULL, NULL, ?, 0, 0, ?)
                         ON CONFLICT(id) DO NOTHING",
                    )
                    .bind(&rendered)
                    .bind(&agent_project_id)
                    .bind(&agent_name)
                    .bind(ts)
                    .execute(&mut *txn)
                    .await?;

                    add_member_txn(
                        &mut txn,
                        &rendered,
                        &agent_name,
                        agent_project_id.as_deref(),
                        &agent_name,
                        "explicit",
                        false,
                        true,
                        false,
                        true,
                        false,
                        ts,
                    )
                    .await?;

                    Ok((txn, rendered))
                }
            })
            .await
    }

    /// Get or create a DM channel between `a` and `b`, enforcing `b`'s
    /// `dm_policy` (spec §4.3): open allows unconditionally; restricted
    /// requires `a` on `b`'s allow-list; closed always forbids.
    pub async fn create_or_get_dm(&self, a: &AgentKey, b: &AgentKey) -> DomainResult<String> {
        let id = ChannelId::dm(a, b).render();
        if self.get_channel(&id).await?.is_some() {
            return Ok(id);
        }

        let identity = IdentityModel::new(self.store);
        let b_agent = identity
            .get_agent(&b.name, b.project_id.as_deref())
            .await?
            .ok_or_else(|| DomainError::AgentNotFound(b.render()))?;

        match b_agent.dm_policy {
            DmPolicy::Closed => return Err(DomainError::DMForbidden),
            DmPolicy::Restricted => {
                let allowed: Option<(String,)> = sqlx::query_as(
                    "SELECT allowed_name FROM agent_dm_allowlist
                     WHERE agent_name = ? AND agent_project_id IS ? AND allowed_name = ? AND allowed_project_id IS ?",
                )
                .bind(&b.name)
                .bind(&b.project_id)
                .bind(&a.name)
                .bind(&a.project_id)
                .fetch_optional(self.store.reader_conn())
                .await?;
                if allowed.is_none() {
                    return Err(DomainError::DMForbidden);
                }
            }
            DmPolicy::Open => {}
        }

        let rendered = id.clone();
        let (a_name, a_proj) = (a.name.clone(), a.project_id.clone());
        let (b_name, b_proj) = (b.name.clone(), b.project_id.clone());
        let ts = now();

        self.store
            .writer_txn(move |mut txn| {
                let rendered = rendered.clone();
                async move {
                    sqlx::query(
                        "INSERT INTO channels (id, channel_type, access_type, scope, project_id, name,
                            description, created_by, is_default, archived, created_at)
                         VALUES (?, 'dm', 'private', 'dm', NULL, NULL, NULL, ?, 0, 0, ?)
                         ON CONFLICT(id) DO NOTHING",
                    )
                    .bind(&rendered)
                    .bind(&a_name)
                    .bind(ts)
                    .execute(&mut *txn)
                    .await?;

                    for (name, proj) in [(&a_name, &a_proj), (&b_name, &b_proj)] {
                        add_member_txn(
                            &mut txn,
                            &rendered,
                            name,
                            proj.as_deref(),
                            &a_name,
                            "explicit",
                            false,
                            true,
                            false,
                            false,
                            false,
                            ts,
                        )
                        .await?;
                    }

                    Ok((txn, rendered))
                }
            })
            .await
    }

    /// Join a channel. Allowed iff the channel is open, or the agent is
    /// already invited (spec §4.3) — the latter is a no-op confirming
    /// existing membership. Otherwise fails with `Invalid`.
    pub async fn join_channel(&self, channel_id: &str, agent: &AgentKey) -> DomainResult<()> {
        let channel = self
            .get_channel(channel_id)
            .await?
            .ok_or_else(|| DomainError::ChannelNotFound(channel_id.to_string()))?;
        if channel.archived {
            return Err(DomainError::Archived);
        }
        if self.get_member(channel_id, agent).await?.is_some() {
            return Ok(());
        }
        if channel.access_type != AccessType::Open {
            return Err(DomainError::Invalid(
                "channel is not open; ask a member to invite you".into(),
            ));
        }

        let channel_id = channel_id.to_string();
        let agent_name = agent.name.clone();
        let agent_project_id = agent.project_id.clone();
        let ts = now();

        self.store
            .writer_txn(move |mut txn| async move {
                add_member_txn(
                    &mut txn,
                    &channel_id,
                    &agent_name,
                    agent_project_id.as_deref(),
                    &agent_name,
                    "explicit",
                    true,
                    true,
                    false,
                    false,
                    false,
                    ts,
                )
                .await?;
                Ok((txn, ()))
            })
            .await
    }

    pub async fn leave_channel(&self, channel_id: &str, agent: &AgentKey) -> DomainResult<()> {
        let member = self
            .get_member(channel_id, agent)
            .await?
            .ok_or(DomainError::NotAMember)?;
        if !member.can_leave {
            return Err(DomainError::NotAllowedToLeave);
        }

        let channel_id = channel_id.to_string();
        let agent_name = agent.name.clone();
        let agent_project_id = agent.project_id.clone();

        self.store
            .writer_txn(move |mut txn| async move {
                sqlx::query(
                    "DELETE FROM channel_members WHERE channel_id = ? AND agent_name = ? AND agent_project_id IS ?",
                )
                .bind(&channel_id)
                .bind(&agent_name)
                .bind(&agent_project_id)
                .execute(&mut *txn)
                .await?;
                Ok((txn, ()))
            })
            .await
    }

    /// `inviter` invites `invitee` into `channel_id`. Requires `inviter` to
    /// hold `can_invite` on that channel.
    pub async fn invite_to_channel(
        &self,
        channel_id: &str,
        inviter: &AgentKey,
        invitee: &AgentKey,
    ) -> DomainResult<()> {
        let channel = self
            .get_channel(channel_id)
            .await?
            .ok_or_else(|| DomainError::ChannelNotFound(channel_id.to_string()))?;
        if channel.archived {
            return Err(DomainError::Archived);
        }

        let inviter_member = self
            .get_member(channel_id, inviter)
            .await?
            .ok_or(DomainError::NotAMember)?;
        if !inviter_member.can_invite {
            return Err(DomainError::NotAllowedToInvite);
        }

        let source = if channel.access_type == AccessType::Members {
            "invitation"
        } else {
            "explicit"
        };

        let channel_id = channel_id.to_string();
        let inviter_name = inviter.name.clone();
        let invitee_name = invitee.name.clone();
        let invitee_project_id = invitee.project_id.clone();
        let ts = now();

        self.store
            .writer_txn(move |mut txn| async move {
                add_member_txn(
                    &mut txn,
                    &channel_id,
                    &invitee_name,
                    invitee_project_id.as_deref(),
                    &inviter_name,
                    source,
                    true,
                    true,
                    false,
                    false,
                    false,
                    ts,
                )
                .await?;
                Ok((txn, ()))
            })
            .await
    }

    pub async fn get_member(&self, channel_id: &str, agent: &AgentKey) -> DomainResult<Option<ChannelMember>> {
        let row = sqlx::query(
            "SELECT channel_id, agent_name, agent_project_id, invited_by, source, can_leave,
                    can_send, can_invite, can_manage, is_from_default, is_muted, joined_at
             FROM channel_members WHERE channel_id = ? AND agent_name = ? AND agent_project_id IS ?",
        )
        .bind(channel_id)
        .bind(&agent.name)
        .bind(&agent.project_id)
        .fetch_optional(self.store.reader_conn())
        .await?;
        Ok(row.map(row_to_member))
    }

    pub async fn list_members(&self, channel_id: &str) -> DomainResult<Vec<ChannelMember>> {
        let rows = sqlx::query(
            "SELECT channel_id, agent_name, agent_project_id, invited_by, source, can_leave,
                    can_send, can_invite, can_manage, is_from_default, is_muted, joined_at
             FROM channel_members WHERE channel_id = ?",
        )
        .bind(channel_id)
        .fetch_all(self.store.reader_conn())
        .await?;
        Ok(rows.into_iter().map(row_to_member).collect())
    }

    /// List channel ids `agent` belongs to (used by Messaging's access
    /// checks and Reconciler's drift detection).
    pub async fn list_channels_for_agent(&self, agent: &AgentKey) -> DomainResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT channel_id FROM channel_members WHERE agent_name = ? AND agent_project_id IS ?",
        )
        .bind(&agent.name)
        .bind(&agent.project_id)
        .fetch_all(self.store.reader_conn())
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    pub async fn check_agent_can_access(&self, channel_id: &str, agent: &AgentKey) -> DomainResult<bool> {
        Ok(self.get_member(channel_id, agent).await?.is_some())
    }

    /// List channels, optionally scoped to `agent`'s memberships and
    /// filtered by `project_id`/`is_default` (spec §6 `GET /api/channels`).
    /// Archived channels are excluded unless `include_archived` is set.
    pub async fn list_channels(
        &self,
        agent: Option<&AgentKey>,
        project_id: Option<&str>,
        include_archived: bool,
        is_default: Option<bool>,
    ) -> DomainResult<Vec<Channel>> {
        let rows = match agent {
            Some(agent) => {
                sqlx::query(
                    "SELECT c.id, c.channel_type, c.access_type, c.scope, c.project_id, c.name,
                            c.description, c.created_by, c.is_default, c.archived, c.created_at
                     FROM channels c
                     JOIN channel_members m ON m.channel_id = c.id
                     WHERE m.agent_name = ? AND m.agent_project_id IS ?
                       AND (? IS NULL OR c.project_id = ?)
                       AND (? = 1 OR c.archived = 0)
                       AND (? IS NULL OR c.is_default = ?)",
                )
                .bind(&agent.name)
                .bind(&agent.project_id)
                .bind(project_id)
                .bind(project_id)
                .bind(include_archived)
                .bind(include_archived)
                .bind(is_default)
                .bind(is_default)
                .fetch_all(self.store.reader_conn())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, channel_type, access_type, scope, project_id, name, description,
                            created_by, is_default, archived, created_at
                     FROM channels
                     WHERE (? IS NULL OR project_id = ?)
                       AND (? = 1 OR archived = 0)
                       AND (? IS NULL OR is_default = ?)",
                )
                .bind(project_id)
                .bind(project_id)
                .bind(include_archived)
                .bind(include_archived)
                .bind(is_default)
                .bind(is_default)
                .fetch_all(self.store.reader_conn())
                .await?
            }
        };
        Ok(rows.into_iter().map(row_to_channel).collect())
    }
}

#[allow(clippy::too_many_arguments)]
async fn add_member_txn(
    txn: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
    channel_id: &str,
    agent_name: &str,
    agent_project_id: Option<&str>,
    invited_by: &str,
    source: &str,
    can_leave: bool,
    can_send: bool,
    can_invite: bool,
    can_manage: bool,
    is_from_default: bool,
    joined_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO channel_members (channel_id, agent_name, agent_project_id, invited_by, source,
            can_leave, can_send, can_invite, can_manage, is_from_default, is_muted, joined_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
         ON CONFLICT(channel_id, agent_name, agent_project_id) DO NOTHING",
    )
    .bind(channel_id)
    .bind(agent_name)
    .bind(agent_project_id)
    .bind(invited_by)
    .bind(source)
    .bind(can_leave)
    .bind(can_send)
    .bind(can_invite)
    .bind(can_manage)
    .bind(is_from_default)
    .bind(joined_at)
    .execute(&mut **txn)
    .await?;
    Ok(())
}

fn row_to_channel(row: sqlx::sqlite::SqliteRow) -> Channel {
    Channel {
        id: row.get("id"),
        channel_type: ChannelType::parse(row.get::<String, _>("channel_type").as_str()),
        access_type: AccessType::parse(row.get::<String, _>("access_type").as_str()),
        scope: row.get("scope"),
        project_id: row.get("project_id"),
        name: row.get("name"),
        description: row.get("description"),
        created_by: row.get("created_by"),
        is_default: row.get("is_default"),
        archived: row.get("archived"),
        created_at: row.get("created_at"),
    }
}

fn row_to_member(row: sqlx::sqlite::SqliteRow) -> ChannelMember {
    ChannelMember {
        channel_id: row.get("channel_id"),
        agent_name: row.get("agent_name"),
        agent_project_id: row.get("agent_project_id"),
        invited_by: row.get("invited_by"),
        source: row.get("source"),
        can_leave: row.get("can_leave"),
        can_send: row.get("can_send"),
        can_invite: row.get("can_invite"),
        can_manage: row.get("can_manage"),
        is_from_default: row.get("is_from_default"),
        is_muted: row.get("is_muted"),
        joined_at: row.get("joined_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Discoverable;

    async fn setup() -> Store {
        Store::open("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_channel_rejects_duplicate() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let id = ChannelId::global("team");
        let first = membership
            .create_channel(&id, AccessType::Open, None, "team", None, "alice", false)
            .await
            .unwrap();

        let second = membership
            .create_channel(&id, AccessType::Open, None, "team", None, "bob", false)
            .await;
        assert!(matches!(second, Err(DomainError::Duplicate(_))));

        let members = membership.list_members(&first).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].agent_name, "alice");
    }

    #[tokio::test]
    async fn create_channel_is_default_requires_open() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let id = ChannelId::global("team");
        let result = membership
            .create_channel(&id, AccessType::Members, None, "team", None, "alice", true)
            .await;
        assert!(matches!(result, Err(DomainError::Invalid(_))));
    }

    #[tokio::test]
    async fn notes_channel_is_single_member_private() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let alice = AgentKey::new("alice", None);
        let channel_id = membership.ensure_notes_channel(&alice).await.unwrap();
        let channel = membership.get_channel(&channel_id).await.unwrap().unwrap();
        assert_eq!(channel.access_type, AccessType::Private);

        let members = membership.list_members(&channel_id).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn dm_forbidden_when_recipient_closed() {
        let store = setup().await;
        let identity = IdentityModel::new(&store);
        let membership = MembershipModel::new(&store);

        identity
            .register_agent("bob", None, None, DmPolicy::Closed, Discoverable::Public)
            .await
            .unwrap();

        let alice = AgentKey::new("alice", None);
        let bob = AgentKey::new("bob", None);
        let result = membership.create_or_get_dm(&alice, &bob).await;
        assert!(matches!(result, Err(DomainError::DMForbidden)));
    }

    #[tokio::test]
    async fn dm_allowed_when_restricted_and_allowlisted() {
        let store = setup().await;
        let identity = IdentityModel::new(&store);
        let membership = MembershipModel::new(&store);

        identity
            .register_agent("bob", None, None, DmPolicy::Restricted, Discoverable::Public)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO agent_dm_allowlist (agent_name, agent_project_id, allowed_name, allowed_project_id)
             VALUES ('bob', NULL, 'alice', NULL)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let alice = AgentKey::new("alice", None);
        let bob = AgentKey::new("bob", None);
        let channel_id = membership.create_or_get_dm(&alice, &bob).await.unwrap();
        let members = membership.list_members(&channel_id).await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn leave_then_rejoin_open_channel() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let alice = AgentKey::new("alice", None);
        let id = ChannelId::global("team");
        let channel_id = membership
            .create_channel(&id, AccessType::Open, None, "team", None, "alice", false)
            .await
            .unwrap();

        membership.leave_channel(&channel_id, &alice).await.unwrap();
        assert!(!membership.check_agent_can_access(&channel_id, &alice).await.unwrap());

        membership.join_channel(&channel_id, &alice).await.unwrap();
        assert!(membership.check_agent_can_access(&channel_id, &alice).await.unwrap());
    }

    #[tokio::test]
    async fn join_channel_is_noop_when_already_invited() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let alice = AgentKey::new("alice", None);
        let bob = AgentKey::new("bob", None);
        let id = ChannelId::global("private-team");
        let channel_id = membership
            .create_channel(&id, AccessType::Members, None, "private-team", None, "alice", false)
            .await
            .unwrap();

        membership.invite_to_channel(&channel_id, &alice, &bob).await.unwrap();
        membership.join_channel(&channel_id, &bob).await.unwrap();
        assert!(membership.check_agent_can_access(&channel_id, &bob).await.unwrap());
    }

    #[tokio::test]
    async fn join_channel_rejects_members_access_without_invite() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let bob = AgentKey::new("bob", None);
        let id = ChannelId::global("private-team");
        let channel_id = membership
            .create_channel(&id, AccessType::Members, None, "private-team", None, "alice", false)
            .await
            .unwrap();

        let result = membership.join_channel(&channel_id, &bob).await;
        assert!(matches!(result, Err(DomainError::Invalid(_))));
    }

    #[tokio::test]
    async fn invite_sets_source_invitation_for_members_channel() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let alice = AgentKey::new("alice", None);
        let bob = AgentKey::new("bob", None);
        let id = ChannelId::global("private-team");
        let channel_id = membership
            .create_channel(&id, AccessType::Members, None, "private-team", None, "alice", false)
            .await
            .unwrap();

        membership.invite_to_channel(&channel_id, &alice, &bob).await.unwrap();
        let member = membership.get_member(&channel_id, &bob).await.unwrap().unwrap();
        assert_eq!(member.source, "invitation");
    }

    #[tokio::test]
    async fn list_channels_filters_by_is_default_and_membership() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let alice = AgentKey::new("alice", None);
        let default_id = ChannelId::global("announcements");
        let default_channel = membership
            .create_channel(&default_id, AccessType::Open, None, "announcements", None, "alice", true)
            .await
            .unwrap();
        let other_id = ChannelId::global("random");
        membership
            .create_channel(&other_id, AccessType::Open, None, "random", None, "bob", false)
            .await
            .unwrap();

        let defaults = membership.list_channels(None, None, false, Some(true)).await.unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, default_channel);

        let alice_channels = membership.list_channels(Some(&alice), None, false, None).await.unwrap();
        assert_eq!(alice_channels.len(), 1);
        assert_eq!(alice_channels[0].id, default_channel);
    }

    #[tokio::test]
    async fn invite_sets_source_explicit_for_open_channel() {
        let store = setup().await;
        let membership = MembershipModel::new(&store);
        let alice = AgentKey::new("alice", None);
        let bob = AgentKey::new("bob", None);
        let id = ChannelId::global("team");
        let channel_id = membership
            .create_channel(&id, AccessType::Open, None, "team", None, "alice", false)
            .await
            .unwrap();

        membership.invite_to_channel(&channel_id, &alice, &bob).await.unwrap();
        let member = membership.get_member(&channel_id, &bob).await.unwrap().unwrap();
        assert_eq!(member.source, "explicit");
    }
}
