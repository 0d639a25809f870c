// src/config/frontmatter.rs
// Agent frontmatter extraction (spec §6). Markdown-body parsing is a
// boundary Non-goal; we only need to slice out the `---` preamble and
// parse it as YAML.

use serde::{Deserialize, Serialize};

fn default_dm_policy() -> String {
    "open".to_string()
}

fn default_discoverable() -> String {
    "public".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontmatterChannels {
    #[serde(default)]
    pub global: Vec<String>,
    #[serde(default)]
    pub project: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFrontmatter {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub channels: FrontmatterChannels,
    #[serde(default)]
    pub never_default: bool,
    #[serde(default = "default_dm_policy")]
    pub dm_policy: String,
    #[serde(default = "default_discoverable")]
    pub discoverable: String,
}

/// Extract the block between the first two `---` lines of `markdown_source`
/// and parse it as YAML. Returns `None` if no frontmatter block is present.
pub fn parse(markdown_source: &str) -> anyhow::Result<Option<AgentFrontmatter>> {
    let mut lines = markdown_source.lines();
    match lines.next() {
        Some(first) if first.trim() == "---" => {}
        _ => return Ok(None),
    }

    let mut block = String::new();
    let mut closed = false;
    for line in lines {
        if line.trim() == "---" {
            closed = true;
            break;
        }
        block.push_str(line);
        block.push('\n');
    }
    if !closed {
        return Ok(None);
    }

    let parsed: AgentFrontmatter = serde_yaml::from_str(&block)?;
    Ok(Some(parsed))
}
