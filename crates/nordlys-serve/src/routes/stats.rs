//! Dashboard aggregation endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use nordlys_core::{PostsPerTime, TimeBucket};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostsPerTimeParams {
    pub lang: Option<String>,
    pub time: Option<String>,
}

/// `GET /dashboard/posts-per-time?lang=<iso>&time=<hour|day|week>`
///
/// Post counts bucketed by creation time, optionally restricted to one
/// language. Buckets ascend.
pub async fn posts_per_time(
    State(state): State<AppState>,
    Query(params): Query<PostsPerTimeParams>,
) -> Result<Json<Vec<PostsPerTime>>, ApiError> {
    let bucket = match params.time.as_deref() {
        None | Some("") => TimeBucket::Hour,
        Some(raw) => TimeBucket::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid time bucket '{raw}'")))?,
    };

    let lang = params.lang.as_deref().filter(|l| !l.is_empty());

    let counts = state.store.get_post_count_per_time(lang, bucket).await?;

    tracing::debug!(
        lang = lang.unwrap_or("all"),
        buckets = counts.len(),
        "posts per time served"
    );

    Ok(Json(counts))
}
