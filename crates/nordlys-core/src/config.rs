//! Declarative feeds configuration.
//!
//! The feeds TOML file is the canonical external surface for defining feeds:
//! a `[keywords]` table of named keyword lists plus a `[[feeds]]` array of
//! feed definitions referencing those lists by name. Filter and scoring
//! `type` fields are kept as plain strings here; the registry matches them
//! and reports unknown types together with the offending feed id.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Top-level feeds configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedsConfig {
    /// Named keyword lists referenced by filters and scoring layers.
    #[serde(default)]
    pub keywords: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// One feed definition.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar_path: String,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub scoring: Vec<ScoringConfig>,
}

/// A raw filter entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub kind: String,
    /// ISO-639-1 codes for `language` filters.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Keyword-list references for `keyword` filters.
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A raw scoring entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Keyword-list reference for `keyword` scoring.
    #[serde(default)]
    pub keywords: String,
    /// Author weights for `author` scoring.
    #[serde(default)]
    pub authors: Vec<AuthorWeight>,
}

/// A per-author score factor.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorWeight {
    pub did: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Load and parse the feeds configuration file.
pub fn load_feeds_config(path: impl AsRef<Path>) -> Result<FeedsConfig> {
    let data = std::fs::read_to_string(path.as_ref())?;
    let config: FeedsConfig = toml::from_str(&data)?;
    tracing::info!(
        path = %path.as_ref().display(),
        feeds = config.feeds.len(),
        keyword_lists = config.keywords.len(),
        "feeds configuration loaded"
    );
    Ok(config)
}
