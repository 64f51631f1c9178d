//! The `/.well-known/did.json` document.

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// `GET /.well-known/did.json`
///
/// Binds the configured hostname to this feed generator's service
/// endpoint.
pub async fn did_document(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "@context": ["https://www.w3.org/ns/did/v1"],
        "id": state.service_did(),
        "service": [
            {
                "id": "#bsky_fg",
                "type": "BskyFeedGenerator",
                "serviceEndpoint": format!("https://{}", state.hostname),
            }
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state_with_feeds;
    use axum::extract::State;

    #[tokio::test]
    async fn document_binds_hostname_to_service_endpoint() {
        let state = state_with_feeds("");
        let Json(document) = did_document(State(state)).await;

        assert_eq!(document["id"], "did:web:feeds.example.com");
        assert_eq!(
            document["service"][0]["serviceEndpoint"],
            "https://feeds.example.com"
        );
        assert_eq!(document["service"][0]["type"], "BskyFeedGenerator");
    }
}
