//! Vote endpoint handlers.
//!
//! Stateless: every request carries the item and voter it concerns as query
//! parameters (`itemId`, `itemIds`, `userId`; keys are case-sensitive). An
//! empty value counts as absent. The vote store binding is checked before
//! anything else, so a misconfigured server answers 500 on every vote request.

use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use lovevote_core::{AnonymousId, ItemId, ToggleOutcome};

use crate::db::VoteStore;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Most items accepted in one `itemIds` batch read.
pub const MAX_BATCH_ITEMS: usize = 100;

/// Query parameters of `/api/vote`.
#[derive(Debug, Default, Deserialize)]
pub struct VoteParams {
    #[serde(rename = "itemId")]
    pub item_id: Option<String>,
    /// Comma-separated item ids for a batch read.
    #[serde(rename = "itemIds")]
    pub item_ids: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Read vote state.
///
/// - `itemId` present: tally of that item.
/// - `itemIds` present (and no `itemId`): tallies of those items.
/// - neither: global snapshot of every voted item.
///
/// `userId` only decides which entries are reported as loved.
#[instrument(skip_all, fields(item_id = params.item_id.as_deref(), batch = params.item_ids.is_some()))]
pub async fn read(
    State(state): State<AppState>,
    Query(params): Query<VoteParams>,
) -> Result<Response> {
    let store = bound_store(&state)?;
    let voter = AnonymousId::from_query(params.user_id.as_deref())?;

    if let Some(item_id) = ItemId::from_query(params.item_id.as_deref())? {
        let tally = store.tally(&item_id, voter.as_ref()).await?;
        return Ok(Json(tally).into_response());
    }

    if let Some(item_ids) = parse_item_list(params.item_ids.as_deref())? {
        let registry = store.tallies(&item_ids, voter.as_ref()).await?;
        return Ok(Json(registry).into_response());
    }

    let snapshot = store.snapshot(voter.as_ref()).await?;
    tracing::debug!(items = snapshot.len(), "Global snapshot served");
    Ok(Json(snapshot).into_response())
}

/// Toggle the voter's vote on an item.
///
/// Requires both `itemId` and `userId`. Responds with the post-toggle state.
#[instrument(skip_all, fields(item_id = params.item_id.as_deref()))]
pub async fn toggle(
    State(state): State<AppState>,
    Query(params): Query<VoteParams>,
) -> Result<Json<ToggleOutcome>> {
    let store = bound_store(&state)?;

    let item_id = ItemId::from_query(params.item_id.as_deref())?
        .ok_or(AppError::MissingParameter(ItemId::KIND))?;
    let voter = AnonymousId::from_query(params.user_id.as_deref())?
        .ok_or(AppError::MissingParameter(AnonymousId::KIND))?;

    let loved = store.toggle(&item_id, &voter).await?;
    tracing::info!(item_id = %item_id, loved, "Vote toggled");

    Ok(Json(ToggleOutcome { loved }))
}

/// Any method other than GET/HEAD/POST.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, HEAD, POST")],
        "Method not allowed",
    )
}

fn bound_store(state: &AppState) -> Result<&VoteStore> {
    state.store().ok_or(AppError::StoreUnavailable)
}

/// Parse `itemIds`. Blank segments are skipped and duplicates collapsed.
fn parse_item_list(raw: Option<&str>) -> Result<Option<Vec<ItemId>>> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let invalid = |reason: String| AppError::InvalidParameter {
        param: "itemIds",
        reason,
    };

    let mut item_ids = BTreeSet::new();
    for part in raw.split(',').filter(|part| !part.is_empty()) {
        item_ids.insert(ItemId::parse(part).map_err(|e| invalid(e.to_string()))?);
    }

    if item_ids.len() > MAX_BATCH_ITEMS {
        return Err(invalid(format!("at most {MAX_BATCH_ITEMS} items per request")));
    }

    Ok(Some(item_ids.into_iter().collect()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
    };
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ServerConfig, StoreBackend};

    fn app_with(store: Option<VoteStore>) -> Router {
        let config = ServerConfig {
            store: StoreBackend::Memory,
            rate_limit: false,
            ..ServerConfig::default()
        };
        crate::app(AppState::new(config, store))
    }

    fn app() -> Router {
        app_with(Some(VoteStore::memory()))
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Response<Vec<u8>>) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (status, Response::from_parts(parts, bytes.to_vec()))
    }

    async fn json(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let (status, response) = send(app, method, uri).await;
        (status, serde_json::from_slice(response.body()).unwrap())
    }

    #[tokio::test]
    async fn test_global_snapshot_on_empty_table() {
        let app = app();
        let (status, body) = json(&app, Method::GET, "/api/vote").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_toggle_scenario() {
        let app = app();

        let (status, body) = json(&app, Method::POST, "/api/vote?itemId=abc&userId=u1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"loved": true}));

        let (_, body) = json(&app, Method::GET, "/api/vote?itemId=abc").await;
        assert_eq!(body, json!({"count": 1, "loved": false}));

        let (_, body) = json(&app, Method::GET, "/api/vote?itemId=abc&userId=u1").await;
        assert_eq!(body, json!({"count": 1, "loved": true}));

        let (_, body) = json(&app, Method::POST, "/api/vote?itemId=abc&userId=u1").await;
        assert_eq!(body, json!({"loved": false}));

        let (_, body) = json(&app, Method::GET, "/api/vote?itemId=abc").await;
        assert_eq!(body, json!({"count": 0, "loved": false}));
    }

    #[tokio::test]
    async fn test_unvoted_item_is_omitted_from_snapshot() {
        let app = app();
        json(&app, Method::POST, "/api/vote?itemId=a&userId=u1").await;

        let (_, body) = json(&app, Method::GET, "/api/vote").await;
        assert_eq!(body, json!({"a": {"count": 1, "loved": false}}));

        let (_, body) = json(&app, Method::GET, "/api/vote?itemId=never").await;
        assert_eq!(body, json!({"count": 0, "loved": false}));
    }

    #[tokio::test]
    async fn test_snapshot_marks_voter_items() {
        let app = app();
        json(&app, Method::POST, "/api/vote?itemId=a&userId=u1").await;
        json(&app, Method::POST, "/api/vote?itemId=a&userId=u2").await;
        json(&app, Method::POST, "/api/vote?itemId=b&userId=u2").await;

        let (_, body) = json(&app, Method::GET, "/api/vote?userId=u1").await;
        assert_eq!(
            body,
            json!({
                "a": {"count": 2, "loved": true},
                "b": {"count": 1, "loved": false},
            })
        );
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let app = app();
        json(&app, Method::POST, "/api/vote?itemId=a&userId=u1").await;

        let (_, first) = json(&app, Method::GET, "/api/vote?userId=u1").await;
        let (_, second) = json(&app, Method::GET, "/api/vote?userId=u1").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_values_count_as_absent() {
        let app = app();
        json(&app, Method::POST, "/api/vote?itemId=a&userId=u1").await;

        let (status, body) = json(&app, Method::GET, "/api/vote?itemId=&userId=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"a": {"count": 1, "loved": false}}));

        let (status, body) = json(&app, Method::POST, "/api/vote?itemId=a&userId=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing userId"}));
    }

    #[tokio::test]
    async fn test_batch_read() {
        let app = app();
        json(&app, Method::POST, "/api/vote?itemId=a&userId=u1").await;

        let (status, body) =
            json(&app, Method::GET, "/api/vote?itemIds=a,z,,a&userId=u1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "a": {"count": 1, "loved": true},
                "z": {"count": 0, "loved": false},
            })
        );
    }

    #[tokio::test]
    async fn test_item_id_wins_over_item_ids() {
        let app = app();
        let (_, body) = json(&app, Method::GET, "/api/vote?itemId=a&itemIds=b,c").await;
        assert_eq!(body, json!({"count": 0, "loved": false}));
    }

    #[tokio::test]
    async fn test_batch_read_limit() {
        let app = app();
        let ids: Vec<String> = (0..=MAX_BATCH_ITEMS).map(|i| format!("item-{i}")).collect();
        let uri = format!("/api/vote?itemIds={}", ids.join(","));

        let (status, body) = json(&app, Method::GET, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid itemIds");
    }

    #[tokio::test]
    async fn test_post_missing_parameters() {
        let app = app();

        let (status, body) = json(&app, Method::POST, "/api/vote?userId=u1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing itemId"}));

        let (status, body) = json(&app, Method::POST, "/api/vote?itemId=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing userId"}));

        // itemId is reported first when both are missing
        let (_, body) = json(&app, Method::POST, "/api/vote").await;
        assert_eq!(body, json!({"error": "Missing itemId"}));
    }

    #[tokio::test]
    async fn test_oversized_identifier_is_rejected() {
        let app = app();
        let uri = format!("/api/vote?itemId={}", "x".repeat(ItemId::MAX_LENGTH + 1));

        let (status, body) = json(&app, Method::GET, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid itemId");
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let app = app();
        let (status, response) = send(&app, Method::PUT, "/api/vote?itemId=a&userId=u1").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body().as_slice(), b"Method not allowed");
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );

        let (status, _) = send(&app, Method::DELETE, "/api/vote").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_missing_store_binding() {
        let app = app_with(None);

        for (method, uri) in [
            (Method::GET, "/api/vote"),
            (Method::GET, "/api/vote?itemId=a"),
            (Method::POST, "/api/vote?itemId=a&userId=u1"),
            // The binding is checked before parameters
            (Method::POST, "/api/vote"),
        ] {
            let (status, body) = json(&app, method, uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, json!({"error": "Database binding missing"}));
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://lovevote@127.0.0.1:1/lovevote")
            .unwrap();
        let app = app_with(Some(VoteStore::Postgres(pool)));

        let (status, body) = json(&app, Method::POST, "/api/vote?itemId=a&userId=u1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Database error"}));

        let (status, _) = json(&app, Method::GET, "/api/vote").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_json_and_cache_headers() {
        let app = app();
        let (_, response) = send(&app, Method::GET, "/api/vote").await;
        let headers = response.headers();

        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(headers.contains_key("x-request-id"));
    }

    #[test]
    fn test_parse_item_list() {
        assert!(parse_item_list(None).unwrap().is_none());
        assert!(parse_item_list(Some("")).unwrap().is_none());
        assert_eq!(parse_item_list(Some(",,")).unwrap(), Some(Vec::new()));

        let ids = parse_item_list(Some("b,a,b")).unwrap().unwrap();
        let ids: Vec<&str> = ids.iter().map(ItemId::as_str).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
