use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::cli::ServeArgs;
use crate::error::QueryError;
use crate::model::{Drg, GeoLevel, Geography, Observation};
use crate::records::{RecordParams, RecordQuery};
use crate::storage::StoragePaths;
use crate::store::RecordStore;
use crate::summary::{Summary, summarize};
use crate::vocab::FilterVocabulary;

#[derive(Clone)]
struct AppState {
    store: RecordStore,
    vocab: FilterVocabulary,
    records: RecordQuery,
    /// Re-read on every stats request so a reload shows up without a restart.
    meta_path: PathBuf,
}

impl AppState {
    fn new(store: RecordStore, meta_path: PathBuf) -> Self {
        Self {
            vocab: FilterVocabulary::new(store.clone()),
            records: RecordQuery::new(store.clone()),
            store,
            meta_path,
        }
    }
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let paths = StoragePaths::new(&opts.data_dir);
    let store = RecordStore::open_read_only(&paths.db_path).context("open record store")?;
    if read_meta(&paths.meta_path).await.is_none() {
        tracing::warn!(
            "No load metadata at {}; /api/stats reports only the row count until a load writes it",
            paths.meta_path.display()
        );
    }

    let app = router(AppState::new(store, paths.meta_path.clone()));

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(api_stats))
        .route("/api/geo-levels", get(api_geo_levels))
        .route("/api/geos", get(api_geos))
        .route("/api/drgs", get(api_drgs))
        .route("/api/records", get(api_records))
        .route("/api/summary", get(api_summary))
        .layer(cors)
        .with_state(state)
}

async fn read_meta(path: &Path) -> Option<serde_json::Value> {
    let s = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&s).ok()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps query failures to `{ "error": ... }` with a 400 or 500 status.
struct ApiError(QueryError);

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    meta: Option<serde_json::Value>,
    record_count: u64,
}

async fn api_stats(State(st): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let record_count = st.store.count().await.map_err(QueryError::from)?;
    Ok(Json(StatsResponse {
        meta: read_meta(&st.meta_path).await,
        record_count,
    }))
}

async fn api_geo_levels(State(st): State<AppState>) -> Result<Json<Vec<GeoLevel>>, ApiError> {
    Ok(Json(st.vocab.geo_levels().await?))
}

#[derive(Debug, Deserialize)]
struct GeosParams {
    level: Option<String>,
    search: Option<String>,
}

async fn api_geos(
    State(st): State<AppState>,
    Query(p): Query<GeosParams>,
) -> Result<Json<Vec<Geography>>, ApiError> {
    let geos = st
        .vocab
        .geographies(p.level.as_deref(), p.search.as_deref())
        .await?;
    Ok(Json(geos))
}

#[derive(Debug, Deserialize)]
struct DrgsParams {
    search: Option<String>,
}

async fn api_drgs(
    State(st): State<AppState>,
    Query(p): Query<DrgsParams>,
) -> Result<Json<Vec<Drg>>, ApiError> {
    Ok(Json(st.vocab.drgs(p.search.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
struct RecordsParams {
    level: Option<String>,
    geo: Option<String>,
    drg_cd: Option<String>,
}

impl RecordsParams {
    fn as_params(&self) -> RecordParams<'_> {
        RecordParams {
            level: self.level.as_deref(),
            geo: self.geo.as_deref(),
            drg_code: self.drg_cd.as_deref(),
        }
    }
}

async fn api_records(
    State(st): State<AppState>,
    Query(p): Query<RecordsParams>,
) -> Result<Json<Vec<Observation>>, ApiError> {
    Ok(Json(st.records.list(&p.as_params()).await?))
}

async fn api_summary(
    State(st): State<AppState>,
    Query(p): Query<RecordsParams>,
) -> Result<Json<Summary>, ApiError> {
    let rows = st.records.list(&p.as_params()).await?;
    Ok(Json(summarize(&rows)))
}
