//! The feed registry: configuration to compiled feeds.
//!
//! Keyword lists are referenced by name from filters and scoring layers;
//! resolution happens exactly once here, at startup, into embedded prepared
//! expressions. After compilation the registry is read-only and the keyword
//! lists are gone.

use std::collections::{BTreeSet, HashMap};

use nordlys_core::{BuiltQuery, FeedConfig, FeedsConfig, FilterConfig, ScoringConfig};

use crate::builder::FeedQueryBuilder;
use crate::filter::FilterClause;
use crate::keyword::prepare_list;
use crate::scoring::ScoringLayer;
use crate::{FeedError, FeedResult};

/// A compiled feed.
#[derive(Debug, Clone)]
pub struct Feed {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub avatar_path: String,
    /// ISO codes from this feed's language filters, in filter order.
    languages: Vec<String>,
    builder: FeedQueryBuilder,
}

impl Feed {
    /// Compile a query for one page of this feed.
    pub fn build_query(&self, limit: i64, cursor: i64) -> BuiltQuery {
        self.builder.build(limit, cursor)
    }

    /// Whether this feed restricts languages at all.
    pub fn has_language_filter(&self) -> bool {
        !self.languages.is_empty()
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

/// All compiled feeds, keyed by id. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    feeds: HashMap<String, Feed>,
}

impl Registry {
    /// Compile the whole configuration, failing fast on the first invalid
    /// feed.
    pub fn compile(config: &FeedsConfig) -> FeedResult<Self> {
        let mut feeds = HashMap::with_capacity(config.feeds.len());
        for feed_config in &config.feeds {
            let feed = compile_feed(feed_config, &config.keywords)?;
            if feeds.insert(feed.id.clone(), feed).is_some() {
                return Err(FeedError::DuplicateFeedId {
                    feed_id: feed_config.id.clone(),
                });
            }
        }
        tracing::info!(feeds = feeds.len(), "feed registry compiled");
        Ok(Self { feeds })
    }

    pub fn get(&self, id: &str) -> Option<&Feed> {
        self.feeds.get(id)
    }

    /// Feed ids in stable (sorted) order, for enumeration endpoints.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.feeds.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// The union of ISO codes across all feeds' language filters, sorted.
    ///
    /// `None` means "all supported languages": at least one feed carries no
    /// language filter, so ingestion must not restrict by language.
    pub fn target_languages(&self) -> Option<Vec<String>> {
        let mut union = BTreeSet::new();
        for feed in self.feeds.values() {
            if !feed.has_language_filter() {
                return None;
            }
            union.extend(feed.languages().iter().cloned());
        }
        Some(union.into_iter().collect())
    }
}

fn compile_feed(
    config: &FeedConfig,
    keywords: &HashMap<String, Vec<String>>,
) -> FeedResult<Feed> {
    let mut builder = FeedQueryBuilder::new();
    let mut languages = Vec::new();

    for filter in &config.filters {
        if let Some(clause) = compile_filter(&config.id, filter, keywords)? {
            if let FilterClause::Language {
                languages: ref codes,
            } = clause
            {
                for code in codes {
                    if !languages.contains(code) {
                        languages.push(code.clone());
                    }
                }
            }
            builder.add_filter(clause);
        }
    }

    for scoring in &config.scoring {
        builder.add_scoring_layer(compile_scoring(&config.id, scoring, keywords)?);
    }

    Ok(Feed {
        id: config.id.clone(),
        display_name: config.display_name.clone(),
        description: config.description.clone(),
        avatar_path: config.avatar_path.clone(),
        languages,
        builder,
    })
}

/// Compile one filter entry. A language filter with no codes is dropped
/// entirely rather than compiled into a match-nothing clause.
fn compile_filter(
    feed_id: &str,
    config: &FilterConfig,
    keywords: &HashMap<String, Vec<String>>,
) -> FeedResult<Option<FilterClause>> {
    match config.kind.as_str() {
        "language" => {
            if config.languages.is_empty() {
                return Ok(None);
            }
            let languages = config
                .languages
                .iter()
                .map(|code| code.to_lowercase())
                .collect();
            Ok(Some(FilterClause::Language { languages }))
        }
        "keyword" => {
            let include = resolve_lists(feed_id, &config.include, keywords)?;
            let exclude = resolve_lists(feed_id, &config.exclude, keywords)?;
            Ok(Some(FilterClause::Keyword { include, exclude }))
        }
        "exclude_replies" => Ok(Some(FilterClause::ExcludeReplies)),
        other => Err(FeedError::UnknownFilterType {
            feed_id: feed_id.to_string(),
            kind: other.to_string(),
        }),
    }
}

fn compile_scoring(
    feed_id: &str,
    config: &ScoringConfig,
    keywords: &HashMap<String, Vec<String>>,
) -> FeedResult<ScoringLayer> {
    match config.kind.as_str() {
        "time_decay" => Ok(ScoringLayer::TimeDecay {
            weight: config.weight,
        }),
        "keyword" => {
            let tokens = keywords.get(&config.keywords).ok_or_else(|| {
                FeedError::UnknownKeywordList {
                    feed_id: feed_id.to_string(),
                    name: config.keywords.clone(),
                }
            })?;
            Ok(ScoringLayer::Keyword {
                weight: config.weight,
                expression: prepare_list(tokens).unwrap_or_default(),
            })
        }
        "author" => Ok(ScoringLayer::Author {
            weight: config.weight,
            authors: config
                .authors
                .iter()
                .map(|author| (author.did.clone(), author.weight))
                .collect(),
        }),
        other => Err(FeedError::UnknownScoringType {
            feed_id: feed_id.to_string(),
            kind: other.to_string(),
        }),
    }
}

/// Resolve a set of keyword-list references into one prepared expression.
fn resolve_lists(
    feed_id: &str,
    references: &[String],
    keywords: &HashMap<String, Vec<String>>,
) -> FeedResult<Option<String>> {
    let mut tokens = Vec::new();
    for reference in references {
        let list = keywords
            .get(reference)
            .ok_or_else(|| FeedError::UnknownKeywordList {
                feed_id: feed_id.to_string(),
                name: reference.clone(),
            })?;
        tokens.extend(list.iter().cloned());
    }
    Ok(prepare_list(&tokens))
}
