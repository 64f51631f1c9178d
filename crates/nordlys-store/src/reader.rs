//! Read operations: feed queries, dashboard aggregation, and the ingestion
//! watermark.

use chrono::{DateTime, Utc};
use nordlys_core::{BuiltQuery, FeedPost, PostsPerTime, QueryValue, TimeBucket};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::{Store, StoreResult};

impl Store {
    /// Execute a compiled feed query.
    ///
    /// Arguments are bound positionally in the order the compiler pushed
    /// them. Rows that fail to decode are skipped with a warning rather
    /// than failing the page.
    pub async fn get_feed_posts(&self, query: &BuiltQuery) -> StoreResult<Vec<FeedPost>> {
        tracing::debug!(sql = %query.sql, args = query.args.len(), "executing feed query");

        let mut prepared = sqlx::query(&query.sql);
        for arg in &query.args {
            prepared = match arg {
                QueryValue::Text(value) => prepared.bind(value.as_str()),
                QueryValue::TextArray(values) => prepared.bind(&values[..]),
                QueryValue::Int(value) => prepared.bind(*value),
                QueryValue::Float(value) => prepared.bind(*value),
            };
        }

        let rows = prepared.fetch_all(self.pool()).await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_feed_post(row) {
                Ok(post) => posts.push(post),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping undecodable feed row");
                }
            }
        }
        Ok(posts)
    }

    /// Count posts per time bucket, optionally restricted to one language.
    /// Buckets ascend; only used by the dashboard.
    pub async fn get_post_count_per_time(
        &self,
        lang: Option<&str>,
        bucket: TimeBucket,
    ) -> StoreResult<Vec<PostsPerTime>> {
        // The bucket name comes from a closed enum, never from user input.
        let field = bucket.as_sql_field();
        let (sql, lang_filter) = match lang {
            Some(_) => (
                format!(
                    "SELECT date_trunc('{field}', created_at) AS bucket, count(*) AS count \
                     FROM posts WHERE languages && $1 GROUP BY bucket ORDER BY bucket ASC"
                ),
                true,
            ),
            None => (
                format!(
                    "SELECT date_trunc('{field}', created_at) AS bucket, count(*) AS count \
                     FROM posts GROUP BY bucket ORDER BY bucket ASC"
                ),
                false,
            ),
        };

        let mut prepared = sqlx::query(&sql);
        if lang_filter {
            prepared = prepared.bind(vec![lang.unwrap_or_default().to_string()]);
        }

        let rows = prepared.fetch_all(self.pool()).await?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let time: DateTime<Utc> = row.try_get("bucket")?;
            let count: i64 = row.try_get("count")?;
            counts.push(PostsPerTime { time, count });
        }
        Ok(counts)
    }

    /// The most recent `created_at` in the store, or `None` when empty.
    /// The supervisor derives the upstream resume cursor from this.
    pub async fn get_latest_post_timestamp(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM posts")
                .fetch_one(self.pool())
                .await?;
        Ok(latest)
    }
}

/// Decode one feed row. The score column only exists when the feed has
/// scoring layers, so its absence is not an error.
fn decode_feed_post(row: &PgRow) -> Result<FeedPost, sqlx::Error> {
    Ok(FeedPost {
        id: row.try_get("id")?,
        uri: row.try_get("uri")?,
        score: row.try_get("score").ok(),
    })
}
