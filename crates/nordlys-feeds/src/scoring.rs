//! Compiled scoring layers.
//!
//! Layers are additive: the final score is the weighted sum of every
//! layer's expression, and ties always break on descending post id.

use nordlys_core::{BuiltQuery, QueryValue};

/// A compiled scoring layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringLayer {
    /// Recency decay: `(1 + age_days)^-0.5`, 1.0 for a brand-new post.
    TimeDecay { weight: f64 },
    /// Normalized full-text rank `rank/(1+rank)` against a prepared
    /// keyword expression; maps to [0, 1).
    Keyword { weight: f64, expression: String },
    /// Multiplicative per-author factors with a default of 1.0.
    Author {
        weight: f64,
        authors: Vec<(String, f64)>,
    },
}

impl ScoringLayer {
    pub fn weight(&self) -> f64 {
        match self {
            Self::TimeDecay { weight }
            | Self::Keyword { weight, .. }
            | Self::Author { weight, .. } => *weight,
        }
    }

    /// Write this layer's score expression, binding arguments on `query`.
    pub fn expression(&self, query: &mut BuiltQuery) -> String {
        match self {
            Self::TimeDecay { .. } => {
                "(1.0 + (EXTRACT(EPOCH FROM (NOW() - posts.created_at)) / 86400.0))^(-0.5)"
                    .to_string()
            }
            Self::Keyword { expression, .. } => {
                // One bound parameter, referenced twice.
                let placeholder = query.push(QueryValue::Text(expression.clone()));
                format!(
                    "ts_rank(ts_vector, websearch_to_tsquery('simple', {placeholder})) / \
                     (1 + ts_rank(ts_vector, websearch_to_tsquery('simple', {placeholder})))"
                )
            }
            Self::Author { authors, .. } => {
                if authors.is_empty() {
                    return "1.0".to_string();
                }
                let factors: Vec<String> = authors
                    .iter()
                    .map(|(did, weight)| {
                        let did_placeholder = query.push(QueryValue::Text(did.clone()));
                        let weight_placeholder = query.push(QueryValue::Float(*weight));
                        format!(
                            "CASE WHEN posts.author_did = {did_placeholder} \
                             THEN {weight_placeholder} ELSE 1.0 END"
                        )
                    })
                    .collect();
                format!("({})", factors.join(" * "))
            }
        }
    }
}
