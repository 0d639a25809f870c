// src/reconciler/mod.rs
// Declarative desired-state reconciliation (spec §4.5): diff current store
// state against a DesiredState, execute the diff as ordered phases. Each
// action runs in its own writer transaction so a failing action is
// recorded without aborting the rest of its phase (spec's "within a phase,
// actions are independent" relaxed from one-transaction-per-phase to
// one-transaction-per-action — see DESIGN.md).

pub mod desired_state;

use tracing::warn;

use crate::error::DomainResult;
use crate::identity::{AgentKey, Discoverable, DmPolicy, IdentityModel};
use crate::membership::{AccessType, ChannelId, MembershipModel};
use crate::store::Store;

pub use desired_state::{discover_agents, DesiredAgent, DesiredState};

#[derive(Debug, Clone)]
pub enum Action {
    CreateChannel {
        id: ChannelId,
        access_type: AccessType,
        project_id: Option<String>,
        name: String,
        description: Option<String>,
        is_default: bool,
    },
    CreateProjectLink {
        source: String,
        target: String,
        link_type: String,
    },
    RegisterAgent {
        key: AgentKey,
        description: Option<String>,
        dm_policy: DmPolicy,
        discoverable: Discoverable,
        create_notes_channel: bool,
    },
    AddMembership {
        channel_id: String,
        agent: AgentKey,
        source: &'static str,
    },
    RemoveMembership {
        channel_id: String,
        agent: AgentKey,
    },
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: Action,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct ReconciliationPlan {
    pub infrastructure: Vec<Action>,
    pub agents: Vec<Action>,
    pub access: Vec<Action>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.infrastructure.is_empty() && self.agents.is_empty() && self.access.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ReconciliationReport {
    pub outcomes: Vec<ActionOutcome>,
}

impl ReconciliationReport {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }
}

/// Compute the minimal diff between current store state and `desired`,
/// scoped to `project_id` (`None` for the global scope pass).
pub async fn build_plan(
    store: &Store,
    desired: &DesiredState,
    project_id: Option<&str>,
) -> DomainResult<ReconciliationPlan> {
    let membership = MembershipModel::new(store);
    let identity = IdentityModel::new(store);
    let mut plan = ReconciliationPlan::default();

    let default_specs = match project_id {
        None => &desired.config.default_channels.global,
        Some(_) => &desired.config.default_channels.project,
    };
    let scope_channel_ids: Vec<ChannelId> = default_specs
        .iter()
        .map(|spec| match project_id {
            None => ChannelId::global(spec.name.clone()),
            Some(pid) => ChannelId::project(pid.to_string(), spec.name.clone()),
        })
        .collect();

    for (spec, channel_id) in default_specs.iter().zip(scope_channel_ids.iter()) {
        if membership.get_channel(&channel_id.render()).await?.is_none() {
            plan.infrastructure.push(Action::CreateChannel {
                id: channel_id.clone(),
                access_type: AccessType::Open,
                project_id: project_id.map(|s| s.to_string()),
                name: spec.name.clone(),
                description: spec.description.clone(),
                is_default: true,
            });
        }
    }

    if project_id.is_none() {
        for link in &desired.config.project_links {
            let exists: bool = sqlx::query_as::<_, (i64,)>(
                "SELECT 1 FROM project_links WHERE (project_a = ? AND project_b = ?) OR (project_a = ? AND project_b = ?)",
            )
            .bind(&link.source)
            .bind(&link.target)
            .bind(&link.target)
            .bind(&link.source)
            .fetch_optional(store.reader_conn())
            .await?
            .is_some();
            if !exists {
                plan.infrastructure.push(Action::CreateProjectLink {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    link_type: link.link_type.clone(),
                });
            }
        }
    }

    for desired_agent in &desired.agents {
        if desired_agent.key.project_id.as_deref() != project_id {
            continue;
        }
        let existing = identity
            .get_agent(&desired_agent.key.name, desired_agent.key.project_id.as_deref())
            .await?;
        let fm = &desired_agent.frontmatter;
        let needs_register = match &existing {
            None => true,
            Some(agent) => agent.description.as_deref() != fm.description.as_deref(),
        };
        if needs_register {
            plan.agents.push(Action::RegisterAgent {
                key: desired_agent.key.clone(),
                description: fm.description.clone(),
                dm_policy: DmPolicy::parse(&fm.dm_policy),
                discoverable: Discoverable::parse(&fm.discoverable),
                create_notes_channel: true,
            });
        }

        if !fm.never_default {
            for channel_id in &scope_channel_ids {
                let rendered = channel_id.render();
                let spec_name = match channel_id {
                    ChannelId::Global(n) | ChannelId::Project(_, n) => n.as_str(),
                    _ => continue,
                };
                if fm.channels.exclude.iter().any(|e| e == spec_name) {
                    continue;
                }
                let already_member = membership
                    .get_member(&rendered, &desired_agent.key)
                    .await?
                    .is_some();
                if !already_member {
                    plan.access.push(Action::AddMembership {
                        channel_id: rendered,
                        agent: desired_agent.key.clone(),
                        source: "default",
                    });
                }
            }
        }

        let explicit_names: Vec<&str> = match project_id {
            None => fm.channels.global.iter().map(|s| s.as_str()).collect(),
            Some(_) => fm.channels.project.iter().map(|s| s.as_str()).collect(),
        };
        for name in explicit_names {
            let channel_id = match project_id {
                None => ChannelId::global(name.to_string()),
                Some(pid) => ChannelId::project(pid.to_string(), name.to_string()),
            };
            let rendered = channel_id.render();
            if membership.get_channel(&rendered).await?.is_none() {
                continue;
            }
            let already_member = membership.get_member(&rendered, &desired_agent.key).await?.is_some();
            if !already_member {
                plan.access.push(Action::AddMembership {
                    channel_id: rendered,
                    agent: desired_agent.key.clone(),
                    source: "explicit",
                });
            }
        }

        let scope_rendered: Vec<String> = scope_channel_ids.iter().map(|c| c.render()).collect();
        let current_defaults: Vec<(String,)> = sqlx::query_as(
            "SELECT channel_id FROM channel_members
             WHERE agent_name = ? AND agent_project_id IS ? AND is_from_default = 1 AND source = 'default'",
        )
        .bind(&desired_agent.key.name)
        .bind(&desired_agent.key.project_id)
        .fetch_all(store.reader_conn())
        .await?;

        for (channel_id,) in current_defaults {
            let scope_matches = match ChannelId::parse(&channel_id) {
                Some(ChannelId::Global(_)) => project_id.is_none(),
                Some(ChannelId::Project(pid, _)) => Some(pid.as_str()) == project_id,
                _ => false,
            };
            if !scope_matches {
                continue;
            }
            let should_have = !fm.never_default && scope_rendered.contains(&channel_id);
            if !should_have {
                plan.access.push(Action::RemoveMembership {
                    channel_id,
                    agent: desired_agent.key.clone(),
                });
            }
        }
    }

    Ok(plan)
}

/// Execute a phase's actions against the store, one writer transaction per
/// action. Failures are recorded, not propagated.
async fn execute_phase(store: &Store, actions: Vec<Action>) -> Vec<ActionOutcome> {
    let mut outcomes = Vec::with_capacity(actions.len());
    for action in actions {
        let result = execute_action(store, &action).await;
        match result {
            Ok(()) => outcomes.push(ActionOutcome {
                action,
                success: true,
                error: None,
            }),
            Err(err) => {
                warn!(%err, "reconciliation action failed");
                outcomes.push(ActionOutcome {
                    action,
                    success: false,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    outcomes
}

async fn execute_action(store: &Store, action: &Action) -> DomainResult<()> {
    let membership = MembershipModel::new(store);
    let identity = IdentityModel::new(store);

    match action {
        Action::CreateChannel {
            id,
            access_type,
            project_id,
            name,
            description,
            is_default,
        } => {
            membership
                .create_channel(
                    id,
                    *access_type,
                    project_id.as_deref(),
                    name,
                    description.as_deref(),
                    "system",
                    *is_default,
                )
                .await?;
        }
        Action::CreateProjectLink {
            source,
            target,
            link_type,
        } => {
            let source = source.clone();
            let target = target.clone();
            let link_type = link_type.clone();
            store
                .writer_txn(move |mut txn| async move {
                    sqlx::query(
                        "INSERT INTO project_links (project_a, project_b, direction) VALUES (?, ?, ?)
                         ON CONFLICT(project_a, project_b) DO NOTHING",
                    )
                    .bind(&source)
                    .bind(&target)
                    .bind(&link_type)
                    .execute(&mut *txn)
                    .await?;
                    Ok((txn, ()))
                })
                .await?;
        }
        Action::RegisterAgent {
            key,
            description,
            dm_policy,
            discoverable,
            create_notes_channel,
        } => {
            identity
                .register_agent(
                    &key.name,
                    key.project_id.as_deref(),
                    description.as_deref(),
                    *dm_policy,
                    *discoverable,
                )
                .await?;
            if *create_notes_channel {
                membership.ensure_notes_channel(key).await?;
            }
        }
        Action::AddMembership {
            channel_id,
            agent,
            source,
        } => {
            apply_default_membership(store, channel_id, agent, source).await?;
        }
        Action::RemoveMembership { channel_id, agent } => {
            membership.leave_channel(channel_id, agent).await?;
        }
    }
    Ok(())
}

async fn apply_default_membership(
    store: &Store,
    channel_id: &str,
    agent: &AgentKey,
    source: &str,
) -> DomainResult<()> {
    let channel_id = channel_id.to_string();
    let agent_name = agent.name.clone();
    let agent_project_id = agent.project_id.clone();
    let is_from_default = source == "default";
    let source = source.to_string();
    let ts = chrono::Utc::now().timestamp();

    store
        .writer_txn(move |mut txn| async move {
            sqlx::query(
                "INSERT INTO channel_members (channel_id, agent_name, agent_project_id, invited_by, source,
                    can_leave, can_send, can_invite, can_manage, is_from_default, is_muted, joined_at)
                 VALUES (?, ?, ?, 'system', ?, 1, 1, 0, 0, ?, 0, ?)
                 ON CONFLICT(channel_id, agent_name, agent_project_id) DO NOTHING",
            )
            .bind(&channel_id)
            .bind(&agent_name)
            .bind(&agent_project_id)
            .bind(&source)
            .bind(is_from_default)
            .bind(ts)
            .execute(&mut *txn)
            .await?;
            Ok((txn, ()))
        })
        .await
}

/// Execute `plan`'s phases in order: infrastructure, agents, access.
pub async fn execute_plan(store: &Store, plan: ReconciliationPlan) -> ReconciliationReport {
    let mut outcomes = Vec::new();
    outcomes.extend(execute_phase(store, plan.infrastructure).await);
    outcomes.extend(execute_phase(store, plan.agents).await);
    outcomes.extend(execute_phase(store, plan.access).await);
    ReconciliationReport { outcomes }
}
