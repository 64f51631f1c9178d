//! The feed query builder.
//!
//! Compiles a feed's filters and scoring layers plus `(limit, cursor)` into
//! one parameterized SELECT whose ordering is stable under paging.

use nordlys_core::{BuiltQuery, QueryValue};

use crate::filter::FilterClause;
use crate::scoring::ScoringLayer;

/// Builds feed queries with scoring and filters.
#[derive(Debug, Clone, Default)]
pub struct FeedQueryBuilder {
    filters: Vec<FilterClause>,
    scoring: Vec<ScoringLayer>,
}

impl FeedQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: FilterClause) {
        self.filters.push(filter);
    }

    pub fn add_scoring_layer(&mut self, layer: ScoringLayer) {
        self.scoring.push(layer);
    }

    pub fn has_scoring(&self) -> bool {
        !self.scoring.is_empty()
    }

    /// Compile into SQL plus a positional argument vector.
    ///
    /// A non-zero cursor adds `posts.id < cursor` so a page never revisits
    /// rows the previous page returned. Callers probing for a next page
    /// pass `limit + 1` and trim.
    pub fn build(&self, limit: i64, cursor: i64) -> BuiltQuery {
        let mut query = BuiltQuery::default();

        let mut select = vec!["posts.id".to_string(), "posts.uri".to_string()];
        if !self.scoring.is_empty() {
            let terms: Vec<String> = self
                .scoring
                .iter()
                .map(|layer| {
                    let expression = layer.expression(&mut query);
                    format!("({:?} * ({expression}))", layer.weight())
                })
                .collect();
            select.push(format!("({}) AS score", terms.join(" + ")));
        }

        let mut conditions = Vec::new();
        for filter in &self.filters {
            filter.apply(&mut query, &mut conditions);
        }
        if cursor != 0 {
            let placeholder = query.push(QueryValue::Int(cursor));
            conditions.push(format!("posts.id < {placeholder}"));
        }

        let mut sql = format!("SELECT DISTINCT {} FROM posts", select.join(", "));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if self.scoring.is_empty() {
            sql.push_str(" ORDER BY posts.id DESC");
        } else {
            sql.push_str(" ORDER BY score DESC, posts.id DESC");
        }

        let limit_placeholder = query.push(QueryValue::Int(limit));
        sql.push_str(&format!(" LIMIT {limit_placeholder}"));

        query.sql = sql;
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Base query shape
    // =========================================================================

    #[test]
    fn bare_query_orders_by_id() {
        let builder = FeedQueryBuilder::new();
        let query = builder.build(20, 0);
        assert_eq!(
            query.sql,
            "SELECT DISTINCT posts.id, posts.uri FROM posts ORDER BY posts.id DESC LIMIT $1"
        );
        assert_eq!(query.args, vec![QueryValue::Int(20)]);
    }

    #[test]
    fn cursor_adds_id_predicate() {
        let builder = FeedQueryBuilder::new();
        let query = builder.build(20, 31);
        assert_eq!(
            query.sql,
            "SELECT DISTINCT posts.id, posts.uri FROM posts \
             WHERE posts.id < $1 ORDER BY posts.id DESC LIMIT $2"
        );
        assert_eq!(query.args, vec![QueryValue::Int(31), QueryValue::Int(20)]);
    }

    #[test]
    fn zero_cursor_means_newest() {
        let query = FeedQueryBuilder::new().build(10, 0);
        assert!(!query.sql.contains("posts.id <"));
    }

    // =========================================================================
    // Filters AND together
    // =========================================================================

    #[test]
    fn filters_are_conjunctive() {
        let mut builder = FeedQueryBuilder::new();
        builder.add_filter(FilterClause::Language {
            languages: vec!["nb".to_string()],
        });
        builder.add_filter(FilterClause::ExcludeReplies);
        let query = builder.build(20, 0);
        assert!(query
            .sql
            .contains("WHERE languages && $1 AND posts.parent_uri IS NULL"));
    }

    #[test]
    fn keyword_exclude_is_negated() {
        let mut builder = FeedQueryBuilder::new();
        builder.add_filter(FilterClause::Keyword {
            include: Some("tech*".to_string()),
            exclude: Some("buy*".to_string()),
        });
        let query = builder.build(20, 0);
        assert!(query
            .sql
            .contains("ts_vector @@ websearch_to_tsquery('simple', $1)"));
        assert!(query
            .sql
            .contains("AND NOT (ts_vector @@ websearch_to_tsquery('simple', $2))"));
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    #[test]
    fn scoring_projects_weighted_sum_and_reorders() {
        let mut builder = FeedQueryBuilder::new();
        builder.add_scoring_layer(ScoringLayer::TimeDecay { weight: 1.0 });
        builder.add_scoring_layer(ScoringLayer::Keyword {
            weight: 2.0,
            expression: "tech*".to_string(),
        });
        let query = builder.build(20, 0);

        assert!(query.sql.starts_with("SELECT DISTINCT posts.id, posts.uri, ("));
        assert!(query.sql.contains("(1.0 * ("));
        assert!(query.sql.contains("(2.0 * ("));
        assert!(query.sql.contains(") AS score"));
        assert!(query.sql.ends_with("ORDER BY score DESC, posts.id DESC LIMIT $2"));
        // Keyword expression bound once, limit second.
        assert_eq!(
            query.args,
            vec![QueryValue::Text("tech*".into()), QueryValue::Int(20)]
        );
    }

    #[test]
    fn score_args_precede_filter_args() {
        let mut builder = FeedQueryBuilder::new();
        builder.add_filter(FilterClause::Language {
            languages: vec!["nb".to_string()],
        });
        builder.add_scoring_layer(ScoringLayer::Keyword {
            weight: 1.0,
            expression: "tech*".to_string(),
        });
        let query = builder.build(20, 11);
        assert_eq!(
            query.args,
            vec![
                QueryValue::Text("tech*".into()),
                QueryValue::TextArray(vec!["nb".into()]),
                QueryValue::Int(11),
                QueryValue::Int(20),
            ]
        );
        // Placeholders in the SQL line up with the vector.
        assert!(query.sql.contains("websearch_to_tsquery('simple', $1)"));
        assert!(query.sql.contains("languages && $2"));
        assert!(query.sql.contains("posts.id < $3"));
        assert!(query.sql.contains("LIMIT $4"));
    }
}
