//! Compiled feed filters.
//!
//! Each filter contributes one WHERE condition; all filters on a feed AND
//! together, so their order carries no meaning.

use nordlys_core::{BuiltQuery, QueryValue};

/// A compiled filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Posts whose language array overlaps the given codes.
    Language { languages: Vec<String> },
    /// Full-text keyword match with prepared include/exclude expressions.
    Keyword {
        include: Option<String>,
        exclude: Option<String>,
    },
    /// Top-level posts only.
    ExcludeReplies,
}

impl FilterClause {
    /// Append this filter's conditions, binding arguments on `query`.
    pub fn apply(&self, query: &mut BuiltQuery, conditions: &mut Vec<String>) {
        match self {
            Self::Language { languages } => {
                if !languages.is_empty() {
                    let placeholder = query.push(QueryValue::TextArray(languages.clone()));
                    conditions.push(format!("languages && {placeholder}"));
                }
            }
            Self::Keyword { include, exclude } => {
                if let Some(include) = include {
                    let placeholder = query.push(QueryValue::Text(include.clone()));
                    conditions.push(format!(
                        "ts_vector @@ websearch_to_tsquery('simple', {placeholder})"
                    ));
                }
                if let Some(exclude) = exclude {
                    let placeholder = query.push(QueryValue::Text(exclude.clone()));
                    conditions.push(format!(
                        "NOT (ts_vector @@ websearch_to_tsquery('simple', {placeholder}))"
                    ));
                }
            }
            Self::ExcludeReplies => {
                conditions.push("posts.parent_uri IS NULL".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(filter: &FilterClause) -> (BuiltQuery, Vec<String>) {
        let mut query = BuiltQuery::default();
        let mut conditions = Vec::new();
        filter.apply(&mut query, &mut conditions);
        (query, conditions)
    }

    #[test]
    fn language_filter_binds_array() {
        let filter = FilterClause::Language {
            languages: vec!["nb".to_string(), "nn".to_string()],
        };
        let (query, conditions) = apply(&filter);
        assert_eq!(conditions, vec!["languages && $1"]);
        assert_eq!(
            query.args,
            vec![QueryValue::TextArray(vec!["nb".into(), "nn".into()])]
        );
    }

    #[test]
    fn empty_language_filter_is_a_no_op() {
        let filter = FilterClause::Language { languages: vec![] };
        let (query, conditions) = apply(&filter);
        assert!(conditions.is_empty());
        assert!(query.args.is_empty());
    }

    #[test]
    fn keyword_filter_excludes_with_not() {
        let filter = FilterClause::Keyword {
            include: Some("tech*".to_string()),
            exclude: Some("buy*".to_string()),
        };
        let (query, conditions) = apply(&filter);
        assert_eq!(
            conditions,
            vec![
                "ts_vector @@ websearch_to_tsquery('simple', $1)",
                "NOT (ts_vector @@ websearch_to_tsquery('simple', $2))",
            ]
        );
        assert_eq!(
            query.args,
            vec![
                QueryValue::Text("tech*".into()),
                QueryValue::Text("buy*".into())
            ]
        );
    }

    #[test]
    fn exclude_replies_requires_null_parent() {
        let (query, conditions) = apply(&FilterClause::ExcludeReplies);
        assert_eq!(conditions, vec!["posts.parent_uri IS NULL"]);
        assert!(query.args.is_empty());
    }
}
