//! Relevance scoring of resolvable dependencies
//!
//! All candidates go to the model in one batch. The response is decoded into
//! a [`ScoreParse`]; only a response that is not a JSON object at all falls
//! back to zero scores for every candidate.

mod anthropic;
mod cutoff;
mod parse;

pub use anthropic::AnthropicModel;
pub use cutoff::select_qualifying;
pub use parse::{extract_json_text, parse_scores, ScoreParse};

use crate::error::Result;
use crate::model::DependencyScores;
use async_trait::async_trait;
use std::collections::HashMap;

const INSTRUCTION: &str = "You are scoring repository dependencies for signal. \
Given a list of npm packages, return a JSON object mapping each package name to two floats in [0,1]: relevance and niche. \
Relevance: How much knowing this package helps understand the repo (frameworks, runtimes, routers, state mgmt, ORMs, build tools are high). Helpers and utilities are low. \
Niche: Common/popular packages are low (react, nextjs), niche/less ubiquitous are high (effect, hono, convex, supabase, clerk). \
Respond with JSON only of shape { pkg: { relevance: number, niche: number } }.";

/// Single-turn text completion
#[async_trait]
pub trait ScoringModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Prompt for one batch of package names
pub fn build_prompt(candidates: &[String]) -> String {
    let names = serde_json::Value::from(candidates.to_vec());
    format!(
        "{}\n\nPackages: {}\nReturn JSON mapping package -> {{relevance, niche}}.",
        INSTRUCTION, names
    )
}

/// Score the candidates with one model call.
///
/// An empty candidate list never reaches the model.
pub async fn score_dependencies(
    model: &dyn ScoringModel,
    candidates: &[String],
) -> Result<HashMap<String, DependencyScores>> {
    if candidates.is_empty() {
        tracing::debug!("No dependencies with a repository; skipping scoring call");
        return Ok(HashMap::new());
    }

    let response = model.complete(&build_prompt(candidates)).await?;

    match parse_scores(&response, candidates) {
        ScoreParse::Parsed(scores) => {
            tracing::info!("Scored {}/{} dependencies", scores.len(), candidates.len());
            Ok(scores)
        }
        ScoreParse::Failed => {
            tracing::warn!(
                "Scoring response was not a JSON object; rating all {} candidates zero",
                candidates.len()
            );
            Ok(candidates
                .iter()
                .map(|name| (name.clone(), DependencyScores::zero()))
                .collect())
        }
    }
}
