// Reconciliation convergence: two consecutive runs over the same desired
// state must leave the second run with zero actions (spec §4.5, §8).

use claude_slack::config::frontmatter::AgentFrontmatter;
use claude_slack::config::{DefaultChannelSpec, DefaultChannels, SlackConfig};
use claude_slack::identity::AgentKey;
use claude_slack::reconciler::{build_plan, execute_plan, DesiredAgent, DesiredState};
use claude_slack::store::Store;

fn desired_state() -> DesiredState {
    let mut config = SlackConfig::default();
    config.default_channels = DefaultChannels {
        global: vec![
            DefaultChannelSpec {
                name: "announcements".to_string(),
                description: None,
            },
            DefaultChannelSpec {
                name: "random".to_string(),
                description: Some("off-topic".to_string()),
            },
        ],
        project: vec![],
    };

    let agents = vec![
        DesiredAgent {
            key: AgentKey::new("alice", None),
            frontmatter: AgentFrontmatter {
                name: "alice".to_string(),
                description: Some("lead".to_string()),
                tools: vec![],
                channels: Default::default(),
                never_default: false,
                dm_policy: "open".to_string(),
                discoverable: "public".to_string(),
            },
        },
        DesiredAgent {
            key: AgentKey::new("bob", None),
            frontmatter: AgentFrontmatter {
                name: "bob".to_string(),
                description: None,
                tools: vec![],
                channels: Default::default(),
                never_default: false,
                dm_policy: "open".to_string(),
                discoverable: "public".to_string(),
            },
        },
    ];

    DesiredState::new(config, agents)
}

#[tokio::test]
async fn second_reconciliation_run_is_a_noop() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let desired = desired_state();

    let plan1 = build_plan(&store, &desired, None).await.unwrap();
    assert!(!plan1.is_empty());
    let report1 = execute_plan(&store, plan1).await;
    assert!(report1.success());

    let plan2 = build_plan(&store, &desired, None).await.unwrap();
    assert!(plan2.is_empty(), "second run should converge to zero actions");
}
