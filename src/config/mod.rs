// src/config/mod.rs
// YAML configuration loading for the Reconciler's desired-state input
// (spec §6). Grounded on the domain-config composition style of
// backend/src/config/mod.rs and backend/src/config/server.rs, scaled down
// to the single YAML document this spec defines rather than many
// env-var-sourced sub-configs.

pub mod frontmatter;

use std::path::Path;

use serde::{Deserialize, Serialize};

fn default_message_retention_days() -> u32 {
    30
}

fn default_max_message_length() -> usize {
    4000
}

fn default_auto_create_channels() -> bool {
    true
}

fn default_auto_link_projects() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultChannelSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultChannels {
    #[serde(default)]
    pub global: Vec<DefaultChannelSpec>,
    #[serde(default)]
    pub project: Vec<DefaultChannelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLinkSpec {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_message_retention_days")]
    pub message_retention_days: u32,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default = "default_auto_create_channels")]
    pub auto_create_channels: bool,
    #[serde(default = "default_auto_link_projects")]
    pub auto_link_projects: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            message_retention_days: default_message_retention_days(),
            max_message_length: default_max_message_length(),
            auto_create_channels: default_auto_create_channels(),
            auto_link_projects: default_auto_link_projects(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub version: u32,
    #[serde(default)]
    pub default_channels: DefaultChannels,
    #[serde(default)]
    pub project_links: Vec<ProjectLinkSpec>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub default_mcp_tools: Vec<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            version: 1,
            default_channels: DefaultChannels::default(),
            project_links: Vec::new(),
            settings: Settings::default(),
            default_mcp_tools: Vec::new(),
        }
    }
}

impl SlackConfig {
    /// Load from a YAML file; missing `settings.*` fields fall back to the
    /// defaults named in SPEC_FULL.md §6.2.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let config: SlackConfig = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    /// Resolve `$CLAUDE_CONFIG_DIR/claude-slack/config.yaml`, defaulting
    /// `CLAUDE_CONFIG_DIR` to `~/.claude`.
    pub fn default_path() -> anyhow::Result<std::path::PathBuf> {
        let root = claude_config_dir()?;
        Ok(root.join("claude-slack").join("config.yaml"))
    }
}

/// `$CLAUDE_CONFIG_DIR`, defaulting to `~/.claude`.
pub fn claude_config_dir() -> anyhow::Result<std::path::PathBuf> {
    if let Ok(dir) = std::env::var("CLAUDE_CONFIG_DIR") {
        return Ok(std::path::PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(".claude"))
        .ok_or_else(|| anyhow::anyhow!("could not resolve home directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_applies_setting_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(
            &path,
            r#"
version: 1
default_channels:
  global:
    - name: announcements
  project: []
"#,
        )
        .await
        .unwrap();

        let config = SlackConfig::load(&path).await.unwrap();
        assert_eq!(config.settings.message_retention_days, 30);
        assert_eq!(config.settings.max_message_length, 4000);
        assert_eq!(config.default_channels.global.len(), 1);
        assert_eq!(config.default_channels.global[0].name, "announcements");
    }

    #[tokio::test]
    async fn load_honors_explicit_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(
            &path,
            r#"
version: 1
settings:
  message_retention_days: 7
  max_message_length: 100
  auto_create_channels: false
  auto_link_projects: true
"#,
        )
        .await
        .unwrap();

        let config = SlackConfig::load(&path).await.unwrap();
        assert_eq!(config.settings.message_retention_days, 7);
        assert!(!config.settings.auto_create_channels);
        assert!(config.settings.auto_link_projects);
    }
}
