// src/membership/id.rs
// Channel id grammar (spec §6, bit-exact):
//   global:<name> | proj:<project_id>:<name>
//   dm:<key>:<key>         (agent keys sorted)
//   notes:<name>:<scope>   (scope is "global" or a project HEX32)

use crate::identity::AgentKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelId {
    Global(String),
    Project(String, String),
    Dm(String, String),
    Notes(String, String),
}

impl ChannelId {
    pub fn global(name: impl Into<String>) -> Self {
        ChannelId::Global(name.into())
    }

    pub fn project(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        ChannelId::Project(project_id.into(), name.into())
    }

    /// Build a DM channel id from two agent keys, sorting them so the id
    /// is independent of call order.
    pub fn dm(a: &AgentKey, b: &AgentKey) -> Self {
        let ra = a.render();
        let rb = b.render();
        if ra <= rb {
            ChannelId::Dm(ra, rb)
        } else {
            ChannelId::Dm(rb, ra)
        }
    }

    /// `notes:<name>:<scope>`, scope being `"global"` for global agents or
    /// the agent's project id.
    pub fn notes(agent: &AgentKey) -> Self {
        let scope = agent.project_id.clone().unwrap_or_else(|| "global".to_string());
        ChannelId::Notes(agent.name.clone(), scope)
    }

    pub fn render(&self) -> String {
        match self {
            ChannelId::Global(name) => format!("global:{name}"),
            ChannelId::Project(project_id, name) => format!("proj:{project_id}:{name}"),
            ChannelId::Dm(a, b) => format!("dm:{a}:{b}"),
            ChannelId::Notes(name, scope) => format!("notes:{name}:{scope}"),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(2, ':');
        let scheme = parts.next()?;
        let rest = parts.next()?;
        match scheme {
            "global" => Some(ChannelId::Global(rest.to_string())),
            "proj" => {
                let (project_id, name) = rest.split_once(':')?;
                Some(ChannelId::Project(project_id.to_string(), name.to_string()))
            }
            "dm" => {
                let (a, b) = rest.split_once(':')?;
                Some(ChannelId::Dm(a.to_string(), b.to_string()))
            }
            "notes" => {
                let (name, scope) = rest.split_once(':')?;
                Some(ChannelId::Notes(name.to_string(), scope.to_string()))
            }
            _ => None,
        }
    }

    pub fn scope(&self) -> &'static str {
        match self {
            ChannelId::Global(_) => "global",
            ChannelId::Project(_, _) => "project",
            ChannelId::Dm(_, _) => "dm",
            ChannelId::Notes(_, _) => "notes",
        }
    }
}
