use axum::{
    extract::{ConnectInfo, RawQuery, State},
    http::{StatusCode, Uri},
    response::Json,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::normalize::parse_exclusions;
use crate::types::{Listing, SearchRequest};
use crate::AppState;

pub const SEARCH_PATH: &str = "/cost_parser/api/v1/search";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(SEARCH_PATH, get(search_handler))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cost-parser",
        "version": env!("CARGO_PKG_VERSION"),
        "searches_in_flight": state.admission.in_flight(),
    }))
}

async fn not_found(uri: Uri) -> StatusCode {
    warn!(path = %uri.path(), "not found");
    StatusCode::NOT_FOUND
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    client: Option<ConnectInfo<SocketAddr>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let client = client
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!(client = %client, query = query.as_deref().unwrap_or(""), "incoming search");

    let request = parse_search_query(query.as_deref())?;
    let permit = state.admission.try_enter()?;

    // The search owns its admission slot and runs to completion even if the
    // caller disconnects.
    let crawler = state.crawler.clone();
    let task_request = request.clone();
    let joined = tokio::spawn(async move {
        let _permit = permit;
        crawler.crawl(&task_request).await
    })
    .await;

    let outcome = match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!(q = %request.term, error = %e, "search failed");
            return Err(e.into());
        }
        Err(e) => {
            error!(q = %request.term, error = %e, "search task faulted");
            return Err(ApiError::Internal(e.to_string()));
        }
    };

    info!(client = %client, q = %request.term, items = outcome.listings.len(), "search handled");
    Ok(Json(outcome.listings))
}

/// Builds a [`SearchRequest`] from the raw query string. `q` is required;
/// `exclude` may repeat; empty price bounds count as absent.
pub fn parse_search_query(query: Option<&str>) -> Result<SearchRequest, ApiError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .into_owned()
        .collect();
    let first = |key: &str| {
        pairs
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim())
    };

    let term = first("q").ok_or_else(|| ApiError::BadRequest("q is required".to_string()))?;
    let min_price = parse_bound("min_price", first("min_price"))?;
    let max_price = parse_bound("max_price", first("max_price"))?;
    let excluded = parse_exclusions(
        pairs
            .iter()
            .filter(|(k, _)| k == "exclude")
            .map(|(_, v)| v.as_str()),
    );

    let mut request = SearchRequest::new(term).price_range(min_price, max_price);
    request.excluded_words = excluded;
    Ok(request)
}

fn parse_bound(key: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
    value
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("{} must be an integer", key)))
        })
        .transpose()
}
