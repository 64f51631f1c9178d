//! Write operations: post upsert and delete.

use chrono::Utc;
use nordlys_core::Post;

use crate::{Store, StoreError, StoreResult, WRITE_TIMEOUT};

/// Upsert statement. `created_at` is intentionally absent from the UPDATE
/// set: re-ingesting a URI refreshes everything else but never the
/// authoritative creation time.
const UPSERT_POST: &str = "\
INSERT INTO posts (uri, created_at, indexed_at, text, parent_uri, languages, author_did)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (uri) DO UPDATE SET
    indexed_at = EXCLUDED.indexed_at,
    text = EXCLUDED.text,
    parent_uri = EXCLUDED.parent_uri,
    languages = EXCLUDED.languages,
    author_did = EXCLUDED.author_did";

impl Store {
    /// Insert a post, or refresh it if the URI already exists.
    ///
    /// Empty parent URIs are normalized to NULL before binding. The call
    /// carries a 30 second deadline; timeouts are recoverable.
    pub async fn create_or_update_post(&self, post: &Post) -> StoreResult<()> {
        let parent_uri = Post::normalize_parent(post.parent_uri.as_deref());
        let lag_seconds = (Utc::now() - post.created_at).num_seconds();

        tracing::debug!(
            uri = %post.uri,
            languages = ?post.languages,
            created_at = %post.created_at,
            lag_seconds,
            "storing post"
        );

        let query = sqlx::query(UPSERT_POST)
            .bind(post.uri.as_str())
            .bind(post.created_at)
            .bind(Utc::now())
            .bind(post.text.as_str())
            .bind(parent_uri)
            .bind(&post.languages[..])
            .bind(post.author_did.as_str())
            .execute(self.pool());

        match tokio::time::timeout(WRITE_TIMEOUT, query).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(StoreError::Timeout(WRITE_TIMEOUT)),
        }
    }

    /// Delete a post by URI. Deleting a URI that was never stored is not an
    /// error.
    pub async fn delete_post(&self, uri: &str) -> StoreResult<()> {
        let query = sqlx::query("DELETE FROM posts WHERE uri = $1")
            .bind(uri)
            .execute(self.pool());

        match tokio::time::timeout(WRITE_TIMEOUT, query).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(StoreError::Timeout(WRITE_TIMEOUT)),
        }
    }
}
