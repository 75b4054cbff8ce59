use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream};
use orcamentos_shared::{ChangeEvent, Table};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::query::RowQuery;
use crate::tables::TableStore;

#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<TableStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            tables: Arc::new(TableStore::new()),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let data_routes = Router::new()
        .route(
            "/rest/v1/:table",
            get(select_rows)
                .post(insert_row)
                .patch(update_rows)
                .delete(delete_rows),
        )
        .route("/realtime/v1/:table", get(stream_changes))
        .route_layer(middleware::from_fn_with_state(
            state.config.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .merge(data_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    api_key_required: bool,
    rows: std::collections::BTreeMap<&'static str, usize>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        api_key_required: state.config.api_key.is_some(),
        rows: state.tables.counts().await,
    })
}

async fn require_api_key(
    State(config): State<Arc<ServerConfig>>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(expected) = &config.api_key {
        if !presents_key(req.headers(), expected) {
            warn!(path = %req.uri().path(), "Rejected request without valid API key");
            return Err(ServerError::Unauthorized);
        }
    }
    Ok(next.run(req).await)
}

/// Accept the key from the `apikey` header or an `Authorization: Bearer`
/// token.
fn presents_key(headers: &HeaderMap, expected: &str) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    [apikey, bearer]
        .into_iter()
        .flatten()
        .any(|token| constant_time_eq(token, expected))
}

fn constant_time_eq(token: &str, expected: &str) -> bool {
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    token_bytes.len() == expected_bytes.len() && token_bytes.ct_eq(expected_bytes).unwrap_u8() == 1
}

async fn select_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Value>>, ServerError> {
    let table: Table = table.parse()?;
    let query = RowQuery::parse(&params)?;
    Ok(Json(state.tables.select(table, &query).await?))
}

async fn insert_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(row): Json<Value>,
) -> Result<(StatusCode, Json<Vec<Value>>), ServerError> {
    let table: Table = table.parse()?;
    let stored = state.tables.insert(table, row).await?;
    Ok((StatusCode::CREATED, Json(vec![stored])))
}

async fn update_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    Json(patch): Json<Value>,
) -> Result<Json<Vec<Value>>, ServerError> {
    let table: Table = table.parse()?;
    let query = RowQuery::parse(&params)?;
    Ok(Json(state.tables.update(table, &query.filters, patch).await?))
}

async fn delete_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Value>>, ServerError> {
    let table: Table = table.parse()?;
    let query = RowQuery::parse(&params)?;
    Ok(Json(state.tables.delete(table, &query.filters).await?))
}

/// `text/event-stream` of every change on `table`, starting from the moment
/// of the request.
async fn stream_changes(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let table: Table = table.parse()?;
    let receiver = state.tables.subscribe(table)?;
    info!(%table, "Change stream opened");

    Ok(Sse::new(change_events(table, receiver)).keep_alive(KeepAlive::default()))
}

fn change_events(
    table: Table,
    receiver: broadcast::Receiver<ChangeEvent<Value>>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(change) => match Event::default().json_data(&change) {
                    Ok(event) => return Some((Ok(event), receiver)),
                    Err(e) => warn!(%table, error = %e, "Failed to encode change event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%table, skipped, "Change stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    fn router(api_key: Option<&str>) -> Router {
        build_router(AppState::new(ServerConfig {
            api_key: api_key.map(str::to_string),
            ..ServerConfig::default()
        }))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = router(Some("k"))
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn data_routes_require_the_key() {
        let app = router(Some("segredo"));

        let denied = app
            .clone()
            .oneshot(HttpRequest::get("/rest/v1/quotes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(denied).await["error"].is_string());

        let allowed = app
            .oneshot(
                HttpRequest::get("/rest/v1/quotes")
                    .header("apikey", "segredo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(body_json(allowed).await, json!([]));
    }

    #[tokio::test]
    async fn unknown_table_is_not_found() {
        let response = router(None)
            .oneshot(HttpRequest::get("/rest/v1/pastas").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn insert_returns_representation() {
        let response = router(None)
            .oneshot(
                HttpRequest::post("/rest/v1/folders")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Obras","color":"bg-blue-100"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let rows = body_json(response).await;
        assert_eq!(rows[0]["name"], "Obras");
        assert!(rows[0]["id"].is_string());
    }

    #[test]
    fn key_comparison() {
        let mut headers = HeaderMap::new();
        assert!(!presents_key(&headers, "k"));
        headers.insert(header::AUTHORIZATION, "Bearer k".parse().unwrap());
        assert!(presents_key(&headers, "k"));
        assert!(!presents_key(&headers, "kk"));
    }
}
