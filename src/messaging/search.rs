// src/messaging/search.rs
// Search candidate-set assembly plus the pluggable Ranker seam (spec §4.4,
// §1 Non-goals: "the embedding/ranking backend for search"). The core's
// only contract is that inaccessible messages never appear in results and
// that results sort by final_score desc, then id desc.

use crate::identity::AgentKey;
use crate::membership::MembershipModel;
use crate::messaging::Message;
use crate::error::DomainResult;

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub channel_ids: Option<Vec<String>>,
    pub project_ids: Option<Vec<String>>,
    /// Exact-match filter over top-level `metadata` keys (spec §4.4); a
    /// candidate is kept only if every key present here matches its value.
    pub metadata_filters: Option<serde_json::Value>,
    /// Opaque hint passed through to the `Ranker`; `DefaultRanker` ignores
    /// it. Not `Option` because the HTTP/core contract requires callers to
    /// name one (spec §6), with `"default"` as the fallback value.
    pub ranking_profile: String,
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            channel_ids: None,
            project_ids: None,
            metadata_filters: None,
            ranking_profile: "default".to_string(),
            limit: 20,
        }
    }
}

/// True iff `metadata` matches every key/value pair in `filters` (an object;
/// any other JSON shape matches vacuously).
pub(crate) fn matches_metadata_filters(metadata: &serde_json::Value, filters: &serde_json::Value) -> bool {
    match filters.as_object() {
        Some(filter_obj) => filter_obj
            .iter()
            .all(|(k, v)| metadata.get(k).is_some_and(|mv| mv == v)),
        None => true,
    }
}

#[derive(Debug, Clone)]
pub struct ScoredMessage {
    pub message: Message,
    pub final_score: f64,
    pub sub_scores: serde_json::Value,
}

/// External collaborator that scores a candidate set. The core never
/// implements ranking itself; `DefaultRanker` is a minimal substring-match
/// fallback so the crate is usable without a real backend wired in.
pub trait Ranker: Send + Sync {
    fn score(&self, query: &SearchQuery, candidates: &[Message]) -> Vec<ScoredMessage>;
}

pub struct DefaultRanker;

impl Ranker for DefaultRanker {
    fn score(&self, query: &SearchQuery, candidates: &[Message]) -> Vec<ScoredMessage> {
        candidates
            .iter()
            .filter_map(|m| {
                let score = match &query.text {
                    Some(text) if !text.is_empty() => {
                        if m.content.to_lowercase().contains(&text.to_lowercase()) {
                            1.0
                        } else {
                            return None;
                        }
                    }
                    _ => 0.0,
                };
                Some(ScoredMessage {
                    message: m.clone(),
                    final_score: score,
                    sub_scores: serde_json::json!({}),
                })
            })
            .collect()
    }
}

/// Assemble the candidate channel set for `caller`: every channel they can
/// access, intersected with `channel_ids`/`project_ids` filters if given.
pub async fn candidate_channel_ids(
    membership: &MembershipModel<'_>,
    caller: &AgentKey,
    channel_ids: Option<&[String]>,
    project_ids: Option<&[String]>,
) -> DomainResult<Vec<String>> {
    let accessible = membership.list_channels_for_agent(caller).await?;

    let mut candidates: Vec<String> = accessible;
    if let Some(filter) = channel_ids {
        candidates.retain(|c| filter.contains(c));
    }
    if let Some(projects) = project_ids {
        let mut filtered = Vec::new();
        for id in candidates {
            if let Some(channel) = membership.get_channel(&id).await? {
                if channel
                    .project_id
                    .as_ref()
                    .map(|p| projects.contains(p))
                    .unwrap_or(false)
                {
                    filtered.push(id);
                }
            }
        }
        candidates = filtered;
    }
    Ok(candidates)
}

/// Sort scored results by final_score desc, then id desc, matching the
/// sort contract guaranteed to callers regardless of which Ranker is used.
pub fn sort_results(mut results: Vec<ScoredMessage>) -> Vec<ScoredMessage> {
    results.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.message.id.cmp(&a.message.id))
    });
    results
}
