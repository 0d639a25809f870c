// src/messaging/mod.rs
// Post/fetch/search of messages and @mention validation (spec §4.4).
// Grounded on the CRUD idiom of
// backend/src/memory/storage/sqlite/core.rs's MemoryOperations.

pub mod mentions;
pub mod retention;
pub mod search;

use sqlx::Row;

use crate::error::{DomainError, DomainResult};
use crate::identity::AgentKey;
use crate::membership::MembershipModel;
use crate::store::Store;

pub use search::{
    candidate_channel_ids, matches_metadata_filters, sort_results, DefaultRanker, Ranker,
    ScoredMessage, SearchQuery,
};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: i64,
    pub channel_id: String,
    pub sender_name: String,
    pub sender_project_id: Option<String>,
    pub content: String,
    pub metadata: serde_json::Value,
    pub confidence: Option<f64>,
    pub thread_id: Option<i64>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MentionPartition {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub unknown: Vec<String>,
}

pub struct Messaging<'a> {
    store: &'a Store,
    membership: MembershipModel<'a>,
}

impl<'a> Messaging<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            membership: MembershipModel::new(store),
        }
    }

    /// Partition `refs` (rendered agent keys, e.g. `"alice"` or
    /// `"bob@<project_id>"`) into valid (member of `channel_id`), invalid
    /// (known agent, not a member), unknown (no such agent) per spec §4.4.
    pub async fn validate_mentions(&self, channel_id: &str, refs: &[String]) -> DomainResult<MentionPartition> {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut unknown = Vec::new();

        for r in refs {
            let key = parse_agent_ref(r);
            let agent_exists: Option<(String,)> = sqlx::query_as(
                "SELECT name FROM agents WHERE name = ? AND project_id IS ?",
            )
            .bind(&key.name)
            .bind(&key.project_id)
            .fetch_optional(self.store.reader_conn())
            .await?;

            if agent_exists.is_none() {
                unknown.push(r.clone());
                continue;
            }

            if self.membership.check_agent_can_access(channel_id, &key).await? {
                valid.push(r.clone());
            } else {
                invalid.push(r.clone());
            }
        }

        Ok(MentionPartition { valid, invalid, unknown })
    }

    /// Post a message. Preconditions: sender is a member with `can_send`;
    /// channel not archived; content within `max_message_length`; thread_id
    /// (if given) references an existing message id or thread_id.
    pub async fn post(
        &self,
        channel_id: &str,
        sender: &AgentKey,
        content: &str,
        metadata: Option<serde_json::Value>,
        thread_id: Option<i64>,
        max_message_length: usize,
    ) -> DomainResult<i64> {
        if content.len() > max_message_length {
            return Err(DomainError::MessageTooLong);
        }

        let refs = mentions::extract_mentions(content);
        let partition = self.validate_mentions(channel_id, &refs).await?;

        let mut meta = metadata.unwrap_or_else(|| serde_json::json!({}));
        if let Some(obj) = meta.as_object_mut() {
            obj.insert(
                "mentions".to_string(),
                serde_json::json!({
                    "valid": partition.valid,
                    "invalid": partition.invalid,
                    "unknown": partition.unknown,
                }),
            );
        }

        let channel_id = channel_id.to_string();
        let sender_name = sender.name.clone();
        let sender_project_id = sender.project_id.clone();
        let content = content.to_string();
        let meta_json = meta.to_string();
        let ts = chrono::Utc::now().timestamp();

        // Re-check channel/membership/can_send inside the same transaction
        // as the insert, so a concurrent leave_channel can't commit between
        // the check and the write (spec §5).
        self.store
            .writer_txn(move |mut txn| async move {
                let archived: Option<(bool,)> =
                    sqlx::query_as("SELECT archived FROM channels WHERE id = ?")
                        .bind(&channel_id)
                        .fetch_optional(&mut *txn)
                        .await?;
                match archived {
                    None => return Err(DomainError::ChannelNotFound(channel_id.clone())),
                    Some((true,)) => return Err(DomainError::Archived),
                    Some((false,)) => {}
                }

                let can_send: Option<(bool,)> = sqlx::query_as(
                    "SELECT can_send FROM channel_members
                     WHERE channel_id = ? AND agent_name = ? AND agent_project_id IS ?",
                )
                .bind(&channel_id)
                .bind(&sender_name)
                .bind(&sender_project_id)
                .fetch_optional(&mut *txn)
                .await?;
                match can_send {
                    None => return Err(DomainError::NotAMember),
                    Some((false,)) => return Err(DomainError::NotAMember),
                    Some((true,)) => {}
                }

                if let Some(tid) = thread_id {
                    let exists: Option<(i64,)> = sqlx::query_as(
                        "SELECT id FROM messages WHERE channel_id = ? AND (id = ? OR thread_id = ?) LIMIT 1",
                    )
                    .bind(&channel_id)
                    .bind(tid)
                    .bind(tid)
                    .fetch_optional(&mut *txn)
                    .await?;
                    if exists.is_none() {
                        return Err(DomainError::InvalidThread);
                    }
                }

                let result = sqlx::query(
                    "INSERT INTO messages (channel_id, sender_name, sender_project_id, content, metadata, confidence, thread_id, timestamp)
                     VALUES (?, ?, ?, ?, ?, NULL, ?, ?)",
                )
                .bind(&channel_id)
                .bind(&sender_name)
                .bind(&sender_project_id)
                .bind(&content)
                .bind(&meta_json)
                .bind(thread_id)
                .bind(ts)
                .execute(&mut *txn)
                .await?;
                Ok((txn, result.last_insert_rowid()))
            })
            .await
    }

    /// Fetch messages in a channel. Caller must be a member.
    pub async fn fetch(
        &self,
        channel_id: &str,
        caller: &AgentKey,
        limit: i64,
        offset: i64,
        since: Option<i64>,
        before: Option<i64>,
    ) -> DomainResult<Vec<Message>> {
        if !self.membership.check_agent_can_access(channel_id, caller).await? {
            return Err(DomainError::NotAMember);
        }

        let rows = sqlx::query(
            "SELECT id, channel_id, sender_name, sender_project_id, content, metadata, confidence, thread_id, timestamp
             FROM messages
             WHERE channel_id = ?
               AND (? IS NULL OR timestamp >= ?)
               AND (? IS NULL OR timestamp < ?)
             ORDER BY id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(channel_id)
        .bind(since)
        .bind(since)
        .bind(before)
        .bind(before)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.store.reader_conn())
        .await?;

        Ok(rows.into_iter().map(row_to_message).collect())
    }

    /// Search across accessible channels, delegating scoring to `ranker`.
    pub async fn search(
        &self,
        caller: &AgentKey,
        query: &SearchQuery,
        ranker: &dyn Ranker,
    ) -> DomainResult<Vec<ScoredMessage>> {
        let channel_ids = candidate_channel_ids(
            &self.membership,
            caller,
            query.channel_ids.as_deref(),
            query.project_ids.as_deref(),
        )
        .await?;

        if channel_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = std::iter::repeat("?")
            .take(channel_ids.len())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, channel_id, sender_name, sender_project_id, content, metadata, confidence, thread_id, timestamp
             FROM messages WHERE channel_id IN ({placeholders}) ORDER BY id DESC LIMIT 500"
        );
        let mut q = sqlx::query(&sql);
        for id in &channel_ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(self.store.reader_conn()).await?;
        let mut candidates: Vec<Message> = rows.into_iter().map(row_to_message).collect();
        if let Some(filters) = &query.metadata_filters {
            candidates.retain(|m| matches_metadata_filters(&m.metadata, filters));
        }

        let scored = ranker.score(query, &candidates);
        let sorted = sort_results(scored);
        Ok(sorted.into_iter().take(query.limit.max(1)).collect())
    }
}

/// True iff `message` satisfies an optional notes `query` (substring match
/// over content) and an optional `tags` filter (message must carry every
/// requested tag under `metadata.notes.tags`), per the notes tagging/query
/// feature in spec §6's `/api/notes` table.
pub fn notes_match(message: &Message, query: Option<&str>, tags: Option<&[String]>) -> bool {
    if let Some(q) = query {
        if !message.content.to_lowercase().contains(&q.to_lowercase()) {
            return false;
        }
    }
    if let Some(want) = tags {
        let have: Vec<&str> = message
            .metadata
            .get("notes")
            .and_then(|n| n.get("tags"))
            .and_then(|t| t.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if !want.iter().all(|t| have.contains(&t.as_str())) {
            return false;
        }
    }
    true
}

fn parse_agent_ref(r: &str) -> AgentKey {
    match r.split_once('@') {
        Some((name, project_id)) => AgentKey::new(name, Some(project_id.to_string())),
        None => AgentKey::new(r, None),
    }
}

fn row_to_message(row: sqlx::sqlite::SqliteRow) -> Message {
    let metadata_text: String = row.get("metadata");
    Message {
        id: row.get("id"),
        channel_id: row.get("channel_id"),
        sender_name: row.get("sender_name"),
        sender_project_id: row.get("sender_project_id"),
        content: row.get("content"),
        metadata: serde_json::from_str(&metadata_text).unwrap_or_else(|_| serde_json::json!({})),
        confidence: row.get("confidence"),
        thread_id: row.get("thread_id"),
        timestamp: row.get("timestamp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Discoverable, DmPolicy, IdentityModel};
    use crate::membership::{AccessType, ChannelId};

    async fn setup_channel_with_members() -> (Store, String) {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let identity = IdentityModel::new(&store);
        let membership = MembershipModel::new(&store);

        identity
            .register_agent("alice", None, None, DmPolicy::Open, Discoverable::Public)
            .await
            .unwrap();
        identity
            .register_agent("bob", None, None, DmPolicy::Open, Discoverable::Public)
            .await
            .unwrap();

        let channel_id = membership
            .create_channel(
                &ChannelId::global("open-discussion"),
                AccessType::Open,
                None,
                "open-discussion",
                None,
                "alice",
                false,
            )
            .await
            .unwrap();

        (store, channel_id)
    }

    #[tokio::test]
    async fn post_requires_membership() {
        let (store, channel_id) = setup_channel_with_members().await;
        let messaging = Messaging::new(&store);
        let eve = AgentKey::new("eve", None);
        let result = messaging.post(&channel_id, &eve, "hi", None, None, 1000).await;
        assert!(matches!(result, Err(DomainError::NotAMember)));
    }

    #[tokio::test]
    async fn post_too_long_rejected() {
        let (store, channel_id) = setup_channel_with_members().await;
        let messaging = Messaging::new(&store);
        let alice = AgentKey::new("alice", None);
        let result = messaging.post(&channel_id, &alice, "hello", None, None, 3).await;
        assert!(matches!(result, Err(DomainError::MessageTooLong)));
    }

    #[tokio::test]
    async fn post_records_mention_partition() {
        let (store, channel_id) = setup_channel_with_members().await;
        let membership = MembershipModel::new(&store);
        membership
            .join_channel(&channel_id, &AgentKey::new("bob", None))
            .await
            .unwrap();

        let messaging = Messaging::new(&store);
        let alice = AgentKey::new("alice", None);
        let id = messaging
            .post(&channel_id, &alice, "hi @bob and @eve", None, None, 1000)
            .await
            .unwrap();

        let messages = messaging.fetch(&channel_id, &alice, 10, 0, None, None).await.unwrap();
        let posted = messages.iter().find(|m| m.id == id).unwrap();
        let mentions = &posted.metadata["mentions"];
        assert_eq!(mentions["valid"], serde_json::json!(["bob"]));
        assert_eq!(mentions["unknown"], serde_json::json!(["eve"]));
    }

    #[tokio::test]
    async fn monotonic_ids_and_nondecreasing_timestamps() {
        let (store, channel_id) = setup_channel_with_members().await;
        let messaging = Messaging::new(&store);
        let alice = AgentKey::new("alice", None);

        let id1 = messaging.post(&channel_id, &alice, "one", None, None, 1000).await.unwrap();
        let id2 = messaging.post(&channel_id, &alice, "two", None, None, 1000).await.unwrap();
        let id3 = messaging.post(&channel_id, &alice, "three", None, None, 1000).await.unwrap();
        assert_eq!(id2, id1 + 1);
        assert_eq!(id3, id2 + 1);
    }

    #[tokio::test]
    async fn post_fails_after_leave_channel() {
        let (store, channel_id) = setup_channel_with_members().await;
        let membership = MembershipModel::new(&store);
        let messaging = Messaging::new(&store);
        let alice = AgentKey::new("alice", None);

        membership.leave_channel(&channel_id, &alice).await.unwrap();
        let result = messaging.post(&channel_id, &alice, "hi", None, None, 1000).await;
        assert!(matches!(result, Err(DomainError::NotAMember)));
    }

    #[test]
    fn notes_match_filters_by_query_and_tags() {
        let message = Message {
            id: 1,
            channel_id: "notes:alice:global".into(),
            sender_name: "alice".into(),
            sender_project_id: None,
            content: "remember to review the PR".into(),
            metadata: serde_json::json!({"notes": {"tags": ["pr", "urgent"]}}),
            confidence: None,
            thread_id: None,
            timestamp: 0,
        };

        assert!(notes_match(&message, Some("review"), None));
        assert!(!notes_match(&message, Some("deploy"), None));
        assert!(notes_match(&message, None, Some(&["pr".to_string()])));
        assert!(!notes_match(&message, None, Some(&["missing".to_string()])));
    }

    #[tokio::test]
    async fn invalid_thread_id_rejected() {
        let (store, channel_id) = setup_channel_with_members().await;
        let messaging = Messaging::new(&store);
        let alice = AgentKey::new("alice", None);
        let result = messaging
            .post(&channel_id, &alice, "reply", None, Some(9999), 1000)
            .await;
        assert!(matches!(result, Err(DomainError::InvalidThread)));
    }
}
