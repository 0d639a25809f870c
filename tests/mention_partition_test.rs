// Mention validation scenario from spec §8.1: channel global:open-discussion,
// open, alice subscribed, bob@proj_alpha known-but-not-member, eve unknown.

use claude_slack::identity::{Discoverable, DmPolicy, IdentityModel};
use claude_slack::membership::{AccessType, ChannelId, MembershipModel};
use claude_slack::messaging::Messaging;
use claude_slack::store::Store;

#[tokio::test]
async fn validate_mentions_partitions_valid_invalid_unknown() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let identity = IdentityModel::new(&store);
    let membership = MembershipModel::new(&store);

    identity
        .register_agent("alice", None, None, DmPolicy::Open, Discoverable::Public)
        .await
        .unwrap();
    identity
        .register_agent(
            "bob",
            Some("proj_alpha"),
            None,
            DmPolicy::Open,
            Discoverable::Public,
        )
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

    let messaging = Messaging::new(&store);
    let refs = vec!["alice".to_string(), "bob@proj_alpha".to_string(), "eve".to_string()];
    let partition = messaging.validate_mentions(&channel_id, &refs).await.unwrap();

    assert_eq!(partition.valid, vec!["alice".to_string()]);
    assert_eq!(partition.invalid, vec!["bob@proj_alpha".to_string()]);
    assert_eq!(partition.unknown, vec!["eve".to_string()]);
}
