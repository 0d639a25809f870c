// DM policy enforcement scenarios from spec §4.3/§8.

use claude_slack::error::DomainError;
use claude_slack::identity::{AgentKey, Discoverable, DmPolicy, IdentityModel};
use claude_slack::membership::MembershipModel;
use claude_slack::store::Store;

#[tokio::test]
async fn closed_recipient_always_forbids_dm() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let identity = IdentityModel::new(&store);
    identity
        .register_agent("bob", None, None, DmPolicy::Closed, Discoverable::Public)
        .await
        .unwrap();

    let membership = MembershipModel::new(&store);
    let result = membership
        .create_or_get_dm(&AgentKey::new("alice", None), &AgentKey::new("bob", None))
        .await;
    assert!(matches!(result, Err(DomainError::DMForbidden)));
}

#[tokio::test]
async fn restricted_recipient_forbids_unless_allowlisted() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let identity = IdentityModel::new(&store);
    identity
        .register_agent("bob", None, None, DmPolicy::Restricted, Discoverable::Public)
        .await
        .unwrap();

    let membership = MembershipModel::new(&store);
    let result = membership
        .create_or_get_dm(&AgentKey::new("alice", None), &AgentKey::new("bob", None))
        .await;
    assert!(matches!(result, Err(DomainError::DMForbidden)));
}

#[tokio::test]
async fn open_recipient_always_allows_dm() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let identity = IdentityModel::new(&store);
    identity
        .register_agent("bob", None, None, DmPolicy::Open, Discoverable::Public)
        .await
        .unwrap();

    let membership = MembershipModel::new(&store);
    let channel_id = membership
        .create_or_get_dm(&AgentKey::new("alice", None), &AgentKey::new("bob", None))
        .await
        .unwrap();

    let members = membership.list_members(&channel_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| !m.can_leave && !m.can_invite && m.can_send));
}
