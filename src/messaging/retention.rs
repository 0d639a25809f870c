// src/messaging/retention.rs
// Periodic deletion of messages older than `message_retention_days`,
// excluding notes:* channels (spec §4.4). Invoked by the WriterService on
// a timer; grounded on the periodic-task idiom visible in
// backend/src/main.rs's background spawn of housekeeping work.

use tracing::info;

use crate::error::DomainResult;
use crate::store::Store;

/// Delete messages whose `timestamp` is older than `retention_days` days,
/// except in any channel whose id starts with `notes:`. Returns the number
/// of rows deleted.
pub async fn sweep_expired_messages(store: &Store, retention_days: u32) -> DomainResult<u64> {
    let cutoff = chrono::Utc::now().timestamp() - (retention_days as i64 * 86_400);

    let deleted = store
        .writer_txn(move |mut txn| async move {
            let result = sqlx::query(
                "DELETE FROM messages WHERE timestamp < ? AND channel_id NOT LIKE 'notes:%'",
            )
            .bind(cutoff)
            .execute(&mut *txn)
            .await?;
            Ok((txn, result.rows_affected()))
        })
        .await?;

    if deleted > 0 {
        info!(deleted, retention_days, "swept expired messages");
    }
    Ok(deleted)
}

/// Run `sweep_expired_messages` on a fixed interval until the process
/// exits. Intended to be spawned once from the WriterService's `main`.
pub async fn run_retention_loop(store: Store, retention_days: u32, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(err) = sweep_expired_messages(&store, retention_days).await {
            tracing::warn!(%err, "retention sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_deletes_old_messages_but_spares_notes() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let old_ts = chrono::Utc::now().timestamp() - (40 * 86_400);
        let recent_ts = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO channels (id, channel_type, access_type, scope, project_id, name, description, created_by, is_default, archived, created_at)
             VALUES ('global:x', 'standard', 'open', 'global', NULL, 'x', NULL, 'alice', 0, 0, 0),
                    ('notes:alice', 'notes', 'private', 'notes', NULL, NULL, NULL, 'alice', 0, 0, 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO messages (channel_id, sender_name, sender_project_id, content, metadata, confidence, thread_id, timestamp)
             VALUES ('global:x', 'alice', NULL, 'old', '{}', NULL, NULL, ?),
                    ('global:x', 'alice', NULL, 'new', '{}', NULL, NULL, ?),
                    ('notes:alice', 'alice', NULL, 'old note', '{}', NULL, NULL, ?)",
        )
        .bind(old_ts)
        .bind(recent_ts)
        .bind(old_ts)
        .execute(store.pool())
        .await
        .unwrap();

        let deleted = sweep_expired_messages(&store, 30).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(store.reader_conn())
            .await
            .unwrap();
        assert_eq!(remaining.0, 2);
    }
}
