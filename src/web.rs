use crate::{
    app::{AppError, MemoryService, Stats},
    documents::{Document, DocumentCreate, DocumentUpdate},
    semantic::{check_params, RankedResult},
};
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::signal;

const INDEX_HTML: &str = include_str!("dashboard.html");

#[derive(Clone)]
struct SharedState {
    service: Arc<MemoryService>,
}

pub fn router(service: Arc<MemoryService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/", get(index))
        .route("/api/stats", get(stats))
        .route("/api/documents", get(list).post(create))
        .route(
            "/api/documents/:id",
            get(get_document).put(update).delete(delete),
        )
        .route("/api/documents/:id/favorite", put(favorite))
        .route("/api/search", get(search))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::warn!("received Ctrl+C, shutting down"),
        _ = terminate => log::warn!("received SIGTERM, shutting down"),
    }
}

async fn start_app(service: Arc<MemoryService>, listen: &str) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Serve the dashboard until Ctrl+C or SIGTERM.
pub fn start_daemon(service: Arc<MemoryService>, listen: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(service, listen))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            AppError::InvalidParameter(_) => axum::http::StatusCode::BAD_REQUEST,
            _ => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn stats(State(state): State<Arc<SharedState>>) -> Json<Stats> {
    Json(state.service.stats())
}

async fn list(State(state): State<Arc<SharedState>>) -> Result<Json<Vec<Document>>, HttpError> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || service.list().map(Json).map_err(Into::into))
}

async fn create(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<DocumentCreate>,
) -> Result<Json<Value>, HttpError> {
    log::debug!("create payload: {} chars", payload.content.chars().count());

    let service = state.service.clone();
    let doc = tokio::task::block_in_place(move || service.add(payload))?;

    Ok(Json(json!({"id": doc.id, "status": "created"})))
}

async fn get_document(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, HttpError> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || service.get(&id).map(Json).map_err(Into::into))
}

async fn update(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    Json(payload): Json<DocumentUpdate>,
) -> Result<Json<Value>, HttpError> {
    log::debug!("update payload: {payload:?}");

    let service = state.service.clone();
    let doc = tokio::task::block_in_place(move || service.update(&id, payload))?;

    Ok(Json(json!({"id": doc.id, "status": "updated"})))
}

async fn delete(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpError> {
    let service = state.service.clone();
    let deleted = id.clone();
    tokio::task::block_in_place(move || service.delete(&id))?;

    Ok(Json(json!({"id": deleted, "status": "deleted"})))
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    favorite: bool,
}

async fn favorite(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<Value>, HttpError> {
    let service = state.service.clone();
    let doc = tokio::task::block_in_place(move || service.set_favorite(&id, payload.favorite))?;

    Ok(Json(
        json!({"id": doc.id, "favorite": doc.favorite, "status": "updated"}),
    ))
}

/// Raw query parameters. Parsed by hand so bad values give a JSON 400.
#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<String>,
    threshold: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchHit {
    #[serde(flatten)]
    document: Document,
    score: f32,
    boosted_score: f32,
}

impl From<RankedResult> for SearchHit {
    fn from(result: RankedResult) -> Self {
        Self {
            document: result.document,
            score: result.score,
            boosted_score: result.boosted_score,
        }
    }
}

fn parse_search(
    params: SearchParams,
    default_limit: usize,
    default_threshold: f32,
) -> Result<(String, usize, f32), AppError> {
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidParameter("query parameter 'q' is required".to_string()))?;

    let limit = match params.limit.as_deref() {
        None | Some("") => default_limit,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::InvalidParameter(format!("invalid limit: {raw}")))?,
    };

    let threshold = match params.threshold.as_deref() {
        None | Some("") => default_threshold,
        Some(raw) => raw
            .parse::<f32>()
            .map_err(|_| AppError::InvalidParameter(format!("invalid threshold: {raw}")))?,
    };

    check_params(limit, threshold)?;

    Ok((query, limit, threshold))
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, HttpError> {
    let service = state.service.clone();
    let defaults = service.search_config();
    let (query, limit, threshold) =
        parse_search(params, defaults.default_limit, defaults.default_threshold)?;

    let results = tokio::task::block_in_place(move || service.search(&query, limit, threshold))?;

    Ok(Json(results.into_iter().map(SearchHit::from).collect()))
}
