// Notes channel privacy: a non-owner agent must never access another
// agent's notes channel (spec §4.3, §8).

use claude_slack::error::DomainError;
use claude_slack::identity::AgentKey;
use claude_slack::membership::MembershipModel;
use claude_slack::messaging::Messaging;
use claude_slack::store::Store;

#[tokio::test]
async fn non_owner_cannot_fetch_notes_channel() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let membership = MembershipModel::new(&store);
    let alice = AgentKey::new("alice", None);
    let channel_id = membership.ensure_notes_channel(&alice).await.unwrap();

    let messaging = Messaging::new(&store);
    let eve = AgentKey::new("eve", None);
    let result = messaging.fetch(&channel_id, &eve, 10, 0, None, None).await;
    assert!(matches!(result, Err(DomainError::NotAMember)));
}

#[tokio::test]
async fn owner_can_post_and_fetch_own_notes() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let membership = MembershipModel::new(&store);
    let alice = AgentKey::new("alice", None);
    let channel_id = membership.ensure_notes_channel(&alice).await.unwrap();

    let messaging = Messaging::new(&store);
    messaging
        .post(&channel_id, &alice, "reminder to self", None, None, 1000)
        .await
        .unwrap();

    let notes = messaging.fetch(&channel_id, &alice, 10, 0, None, None).await.unwrap();
    assert_eq!(notes.len(), 1);
}
