//! HTTP API handlers for PARLogic.
//!
//! The handlers are a thin boundary around the engine: they look records up
//! in the [`UsageStore`], call the engine, and map each [`EngineError`] kind
//! to a status code with a `{"detail": ...}` body. All logging happens here;
//! the engine itself never logs.
//!
//! Engine calls whose cost grows with the analysis window run on the
//! blocking pool, never on the async workers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::analysis::{analyze, monthly_report, record_span};
use crate::batch::{PlanningParams, recommend_all, resolve_lead_time};
use crate::cache::{ProfileCache, ProfileKey};
use crate::config::ServerConfig;
use crate::error::EngineError;
use crate::model::{
    AnalyzeQuery, ErrorResponse, HealthResponse, LeadTimeRequest, LeadTimeResponse,
    LegacyRecommendationResponse, LegacyStockRecommendation, MonthlyReport, PARLevels, ParQuery,
    RecommendationQuery, RecommendationResponse, StockRecommendation, UploadRequest,
    UploadResponse, UsageAnalysisResponse, UsageProfile, UsageRecord,
};
use crate::par::calculate;
use crate::recommendation::recommend;
use crate::store::{ItemSnapshot, UsageStore};

const SERVICE_NAME: &str = "PARLogic API";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: UsageStore,
    /// `None` when profile caching is disabled.
    pub cache: Option<Arc<ProfileCache>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let cache = config
            .cache_enabled
            .then(|| Arc::new(ProfileCache::with_capacity(config.cache_max_entries)));
        Self {
            store: UsageStore::new(),
            cache,
            config: Arc::new(config),
        }
    }
}

/// Build the router with every endpoint and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/upload/", post(upload_records))
        .route("/analyze/usage/", get(analyze_usage))
        .route("/analyze/monthly/", get(analyze_monthly))
        .route("/calculate/par/", get(calculate_par))
        .route("/recommendations/", get(get_recommendations))
        .route("/recommendations/legacy/", get(get_legacy_recommendations))
        .route("/lead-times/", get(list_lead_times))
        .route("/lead-times/:item_id", put(set_lead_time))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Errors surfaced by the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("No data available. Please upload data first.")]
    NoData,

    #[error("Item {0} not found")]
    ItemNotFound(String),

    /// The request could not be decoded.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::InsufficientData(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Engine(_) => StatusCode::BAD_REQUEST,
            ApiError::NoData | ApiError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// [`Query`] that reports malformed query strings as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// [`Json`] that reports malformed bodies as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// GET / and GET /health - Simple health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// POST /upload/ - Store a batch of normalized usage records.
///
/// # Request Body
///
/// ```json
/// {
///     "records": [
///         { "item_id": "SUP001", "date": "2024-01-01", "quantity": 12 }
///     ]
/// }
/// ```
///
/// Cached profiles are dropped, since every window may now see new data.
#[instrument(skip_all)]
pub async fn upload_records(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let rows = match ingest(&state, request.records).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "Rejected usage upload");
            return Err(e.into());
        }
    };

    let items = state.store.known_items().await.len();
    info!(rows, items, "Usage records stored");

    Ok(Json(UploadResponse {
        message: "File processed successfully".to_string(),
        rows,
        items,
    }))
}

/// GET /analyze/usage/ - Usage profile of one item over a window.
///
/// # Query Parameters
///
/// - `start_date`, `end_date` (required): ISO 8601 dates, inclusive
/// - `item_id` (optional): required when more than one item has records
///   in the window
///
/// # Response
///
/// ```json
/// {
///     "item_id": "SUP001",
///     "average_daily_usage": 25.5,
///     "peak_usage": 45.0,
///     "seasonality_factor": 1.2,
///     "trend": "increasing",
///     "confidence_level": 0.93
/// }
/// ```
///
/// `seasonality_factor` is omitted when the window is too short to define it.
#[instrument(skip(state))]
pub async fn analyze_usage(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyzeQuery>,
) -> Result<Json<UsageAnalysisResponse>, ApiError> {
    if state.store.is_empty().await {
        return Err(ApiError::NoData);
    }

    let result = match &query.item_id {
        Some(item_id) => {
            let snapshot = item_snapshot(&state, item_id).await?;
            item_profile(&state, item_id, snapshot, query.start_date, query.end_date).await
        }
        None => {
            let records = state.store.all_records().await;
            let engine = state.config.engine.clone();
            let (start, end) = (query.start_date, query.end_date);
            blocking(move || analyze(&records, start, end, None, &engine))
                .await
                .and_then(|profile| profile.map(Arc::new).map_err(ApiError::from))
        }
    };

    match result {
        Ok(profile) => {
            info!(
                item_id = %profile.item_id,
                trend = ?profile.trend,
                average = profile.average_daily_usage,
                confidence = profile.confidence_level,
                "Usage analyzed"
            );
            Ok(Json(UsageAnalysisResponse::from(profile.as_ref())))
        }
        Err(e) => {
            warn!(item_id = ?query.item_id, error = %e, "Failed to analyze usage");
            Err(e)
        }
    }
}

/// GET /analyze/monthly/ - Month-by-month usage of one item over a window.
///
/// # Query Parameters
///
/// Same as GET /analyze/usage/.
///
/// # Response
///
/// ```json
/// {
///     "item_id": "SUP001",
///     "date_range": { "start": "2024-01-01", "end": "2024-02-29" },
///     "months": [
///         {
///             "year": 2024,
///             "month": 1,
///             "total_usage": 310.0,
///             "average_daily_usage": 10.0,
///             "min_daily_usage": 8.0,
///             "max_daily_usage": 12.0,
///             "std_dev_daily_usage": 1.1
///         }
///     ],
///     "usage_range": {
///         "min_monthly": 310.0,
///         "max_monthly": 870.0,
///         "average_monthly": 590.0,
///         "std_dev": 395.98
///     },
///     "seasonality": {
///         "seasonal_pattern": true,
///         "peak_month": 2,
///         "trough_month": 1,
///         "seasonality_strength": 0.5
///     }
/// }
/// ```
///
/// `seasonality` is omitted when the window covers a single calendar month.
#[instrument(skip(state))]
pub async fn analyze_monthly(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyzeQuery>,
) -> Result<Json<MonthlyReport>, ApiError> {
    if state.store.is_empty().await {
        return Err(ApiError::NoData);
    }

    let records = match &query.item_id {
        Some(item_id) => item_snapshot(&state, item_id).await?.records,
        None => state.store.all_records().await,
    };
    let engine = state.config.engine.clone();
    let item_id = query.item_id.clone();
    let (start, end) = (query.start_date, query.end_date);

    let result = blocking(move || monthly_report(&records, start, end, item_id.as_deref(), &engine))
        .await
        .and_then(|report| report.map_err(ApiError::from));

    match result {
        Ok(report) => {
            info!(
                item_id = %report.item_id,
                months = report.months.len(),
                seasonal = report.seasonality.as_ref().is_some_and(|s| s.seasonal_pattern),
                "Monthly usage analyzed"
            );
            Ok(Json(report))
        }
        Err(e) => {
            warn!(item_id = ?query.item_id, error = %e, "Failed to analyze monthly usage");
            Err(e)
        }
    }
}

/// GET /calculate/par/ - PAR levels for one item.
///
/// # Query Parameters
///
/// - `item_id` (required)
/// - `lead_time_days` (optional): at least 1; defaults to the item's stored
///   lead time, then to the configured default (14)
/// - `service_level` (optional): strictly between 0 and 1, default 0.95
/// - `start_date`, `end_date` (optional): analysis window, defaulting to
///   the item's first and last recorded dates
///
/// # Response
///
/// ```json
/// {
///     "item_id": "SUP001",
///     "min_par": 102.0,
///     "max_par": 281.0,
///     "reorder_point": 102.0,
///     "safety_stock": 25.0,
///     "service_level": 0.95,
///     "lead_time_days": 3
/// }
/// ```
#[instrument(skip(state))]
pub async fn calculate_par(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ParQuery>,
) -> Result<Json<PARLevels>, ApiError> {
    let service_level = query
        .service_level
        .unwrap_or(state.config.default_service_level);

    let snapshot = item_snapshot(&state, &query.item_id).await?;
    let lead_time = resolve_lead_time(
        query.lead_time_days,
        snapshot.lead_time_days,
        &state.config.engine,
    );

    let result = item_levels(
        &state,
        &query.item_id,
        snapshot,
        (query.start_date, query.end_date),
        service_level,
        lead_time,
    )
    .await;

    match result {
        Ok(levels) => {
            info!(
                item_id = %levels.item_id,
                safety_stock = levels.safety_stock,
                reorder_point = levels.reorder_point,
                max_par = levels.max_par,
                "PAR levels calculated"
            );
            Ok(Json(levels))
        }
        Err(e) => {
            warn!(item_id = %query.item_id, error = %e, "Failed to calculate PAR levels");
            Err(e)
        }
    }
}

/// GET /recommendations/ - Reorder recommendations.
///
/// # Query Parameters
///
/// - `item_id` (optional): without it every known item is evaluated
/// - `lead_time_days` (optional): same fallback as GET /calculate/par/
/// - `current_stock` (optional): on-hand quantity, default 0
/// - `service_level` (optional): default 0.95
///
/// # Response
///
/// ```json
/// {
///     "recommendations": [
///         {
///             "item_id": "SUP001",
///             "current_stock": 60.0,
///             "recommended_order": 90.0,
///             "urgency": "medium",
///             "status": "BELOW_MIN",
///             "next_review_date": "2024-03-08",
///             "details": "Current stock (60) is at or below reorder point (75). ..."
///         }
///     ],
///     "timestamp": "2024-03-01T09:00:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_recommendations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecommendationQuery>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let recommendations = build_recommendations(&state, &query).await?;

    Ok(Json(RecommendationResponse {
        recommendations,
        timestamp: Utc::now(),
    }))
}

/// GET /recommendations/legacy/ - Deprecated `recommended_action`/`details` shape.
///
/// Same parameters as GET /recommendations/. Responses carry a
/// `Deprecation: true` header.
#[instrument(skip(state))]
pub async fn get_legacy_recommendations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecommendationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendations = build_recommendations(&state, &query).await?;

    let body = LegacyRecommendationResponse {
        recommendations: recommendations
            .iter()
            .map(LegacyStockRecommendation::from)
            .collect(),
        timestamp: Utc::now(),
    };

    Ok((
        [(HeaderName::from_static("deprecation"), "true")],
        Json(body),
    ))
}

/// PUT /lead-times/{item_id} - Set the supplier lead time of one item.
///
/// # Request Body
///
/// ```json
/// { "lead_time_days": 5 }
/// ```
///
/// Used whenever a request does not pass `lead_time_days` itself.
#[instrument(skip(state))]
pub async fn set_lead_time(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    ApiJson(request): ApiJson<LeadTimeRequest>,
) -> Result<Json<LeadTimeResponse>, ApiError> {
    match state
        .store
        .set_lead_time(&item_id, request.lead_time_days)
        .await
    {
        Ok(lead_time_days) => {
            info!(item_id = %item_id, lead_time_days, "Lead time set");
            Ok(Json(LeadTimeResponse {
                item_id,
                lead_time_days,
            }))
        }
        Err(e) => {
            warn!(item_id = %item_id, error = %e, "Rejected lead time");
            Err(e.into())
        }
    }
}

/// GET /lead-times/ - Every item-specific lead time, sorted by item.
pub async fn list_lead_times(State(state): State<AppState>) -> Json<Vec<LeadTimeResponse>> {
    let entries = state
        .store
        .lead_times()
        .await
        .into_iter()
        .map(|(item_id, lead_time_days)| LeadTimeResponse {
            item_id,
            lead_time_days,
        })
        .collect();
    Json(entries)
}

/// Store a batch and invalidate every cached profile.
async fn ingest(state: &AppState, records: Vec<UsageRecord>) -> Result<usize, EngineError> {
    let rows = state.store.insert_records(records).await?;
    if let Some(cache) = &state.cache {
        cache.clear();
    }
    Ok(rows)
}

async fn build_recommendations(
    state: &AppState,
    query: &RecommendationQuery,
) -> Result<Vec<StockRecommendation>, ApiError> {
    let today = Utc::now().date_naive();
    let service_level = query
        .service_level
        .unwrap_or(state.config.default_service_level);

    if let Some(item_id) = &query.item_id {
        let snapshot = item_snapshot(state, item_id).await?;
        let lead_time = resolve_lead_time(
            query.lead_time_days,
            snapshot.lead_time_days,
            &state.config.engine,
        );

        let result = match item_levels(
            state,
            item_id,
            snapshot,
            (None, None),
            service_level,
            lead_time,
        )
        .await
        {
            Ok(levels) => recommend(&levels, query.current_stock, today, &state.config.engine)
                .map_err(ApiError::from),
            Err(e) => Err(e),
        };

        return match result {
            Ok(rec) => {
                info!(item_id = %rec.item_id, urgency = ?rec.urgency, status = ?rec.status, order = rec.recommended_order, "Recommendation generated");
                Ok(vec![rec])
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "Failed to generate recommendation");
                Err(e)
            }
        };
    }

    if state.store.is_empty().await {
        return Err(ApiError::NoData);
    }

    let params = PlanningParams {
        service_level,
        lead_time_days: query.lead_time_days,
        window: None,
    };
    let histories = state.store.histories(query.current_stock).await;
    let engine = state.config.engine.clone();
    let outcomes = blocking(move || recommend_all(&histories, &params, today, &engine)).await?;

    let mut recommendations = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.result {
            Ok(rec) => recommendations.push(rec),
            Err(e) => {
                warn!(item_id = %outcome.item_id, error = %e, "Failed to generate recommendation");
                return Err(e.into());
            }
        }
    }

    info!(count = recommendations.len(), "Recommendations generated");
    Ok(recommendations)
}

async fn item_snapshot(state: &AppState, item_id: &str) -> Result<ItemSnapshot, ApiError> {
    state
        .store
        .snapshot(item_id)
        .await
        .ok_or_else(|| ApiError::ItemNotFound(item_id.to_string()))
}

/// PAR levels of one item over an optional window.
async fn item_levels(
    state: &AppState,
    item_id: &str,
    snapshot: ItemSnapshot,
    window: (Option<NaiveDate>, Option<NaiveDate>),
    service_level: f64,
    lead_time_days: i64,
) -> Result<PARLevels, ApiError> {
    let (start, end) = resolve_window(&snapshot.records, window.0, window.1, item_id)?;
    let profile = item_profile(state, item_id, snapshot, start, end).await?;

    Ok(calculate(
        &profile,
        service_level,
        lead_time_days,
        &state.config.engine,
    )?)
}

/// Profile for one item, through the cache when it is enabled.
///
/// The cache key carries the snapshot's generation, so a profile built from
/// records read before an upload is never served for data after it.
async fn item_profile(
    state: &AppState,
    item_id: &str,
    snapshot: ItemSnapshot,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Arc<UsageProfile>, ApiError> {
    let key = ProfileKey {
        item_id: item_id.to_string(),
        start,
        end,
        generation: snapshot.generation,
    };
    let engine = state.config.engine.clone();
    let filter = key.item_id.clone();

    let compute = move || async move {
        let profile = blocking(move || {
            analyze(&snapshot.records, start, end, Some(filter.as_str()), &engine)
        })
        .await??;
        Ok::<_, ApiError>(profile)
    };

    match &state.cache {
        Some(cache) => cache.get_or_compute(key, compute).await,
        None => compute().await.map(Arc::new),
    }
}

/// Run CPU-bound engine work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Fill missing window bounds from the item's recorded span.
fn resolve_window(
    records: &[UsageRecord],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    item_id: &str,
) -> Result<(NaiveDate, NaiveDate), EngineError> {
    if let (Some(start), Some(end)) = (start, end) {
        return Ok((start, end));
    }

    let (first, last) = record_span(records).ok_or_else(|| {
        EngineError::InsufficientData(format!("no usage records for item '{item_id}'"))
    })?;

    Ok((start.unwrap_or(first), end.unwrap_or(last)))
}
