// src/reconciler/desired_state.rs
// Builds the desired-state input to reconciliation from the YAML config
// and discovered agent frontmatter files (spec §4.5).

use std::path::Path;

use crate::config::frontmatter::{self, AgentFrontmatter};
use crate::config::SlackConfig;
use crate::identity::AgentKey;

#[derive(Debug, Clone)]
pub struct DesiredAgent {
    pub key: AgentKey,
    pub frontmatter: AgentFrontmatter,
}

#[derive(Debug, Clone)]
pub struct DesiredState {
    pub config: SlackConfig,
    pub agents: Vec<DesiredAgent>,
}

/// Read every `*.md` file directly under `dir`, parse its frontmatter, and
/// attach `project_id` (`None` for the global directory).
pub async fn discover_agents(dir: &Path, project_id: Option<&str>) -> anyhow::Result<Vec<DesiredAgent>> {
    let mut agents = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(agents),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let contents = tokio::fs::read_to_string(&path).await?;
        if let Some(fm) = frontmatter::parse(&contents)? {
            let key = AgentKey::new(fm.name.clone(), project_id.map(|s| s.to_string()));
            agents.push(DesiredAgent { key, frontmatter: fm });
        }
    }
    Ok(agents)
}

impl DesiredState {
    pub fn new(config: SlackConfig, agents: Vec<DesiredAgent>) -> Self {
        Self { config, agents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discover_agents_reads_md_files_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("alice.md"),
            "---\nname: alice\n---\nBody\n",
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("README.txt"), "not an agent").await.unwrap();

        let agents = discover_agents(dir.path(), Some("proj1")).await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].key.name, "alice");
        assert_eq!(agents[0].key.project_id.as_deref(), Some("proj1"));
    }

    #[tokio::test]
    async fn discover_agents_tolerates_missing_directory() {
        let agents = discover_agents(Path::new("/nonexistent/does-not-exist"), None).await.unwrap();
        assert!(agents.is_empty());
    }
}
