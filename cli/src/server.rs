use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use weighlog_core::error::{Locale, LogError};
use weighlog_core::models::{DailyLogEntry, User};
use weighlog_core::service::LogService;
use weighlog_core::view::DashboardView;

const BODY_LIMIT: usize = 64 * 1024; // 64 KB

#[derive(Clone)]
struct AppState {
    service: LogService,
    user: User,
    locale: Locale,
    api_key: Option<String>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
#[serde(untagged)]
enum WeightInput {
    Number(f64),
    Text(String),
}

impl WeightInput {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WeightRequest {
    weight: WeightInput,
}

#[derive(Deserialize)]
struct FoodRequest {
    meal_type: String,
    food: String,
}

#[derive(Deserialize)]
struct DeleteFoodRequest {
    item: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// `alert` is the only text the client sees.
    Internal {
        alert: String,
        source: anyhow::Error,
    },
}

impl ApiError {
    fn from_log(err: LogError, locale: Locale) -> Self {
        let alert = err.alert(locale);
        match err {
            LogError::Validation(_) => Self::BadRequest(alert),
            LogError::Auth(_) => Self::Unauthorized(alert),
            LogError::Storage(_) => Self::Internal {
                alert,
                source: err.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Internal { alert, source } => {
                tracing::error!("Internal server error: {source:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, alert)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyLogEntry>>, ApiError> {
    let entries = state
        .service
        .load_entries(&state.user.uid)
        .await
        .map_err(|e| ApiError::from_log(e, state.locale))?;
    Ok(Json(entries))
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardView>, ApiError> {
    let entries = state
        .service
        .load_entries(&state.user.uid)
        .await
        .map_err(|e| ApiError::from_log(e, state.locale))?;
    Ok(Json(DashboardView::build(&entries)))
}

async fn put_weight(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<WeightRequest>,
) -> Result<Json<Vec<DailyLogEntry>>, ApiError> {
    let entries = state
        .service
        .upsert_weight(&state.user.uid, &date, &req.weight.as_text())
        .await
        .map_err(|e| ApiError::from_log(e, state.locale))?;
    Ok(Json(entries))
}

async fn add_food(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<FoodRequest>,
) -> Result<(StatusCode, Json<Vec<DailyLogEntry>>), ApiError> {
    let entries = state
        .service
        .add_meal(&state.user.uid, &date, &req.meal_type, &req.food)
        .await
        .map_err(|e| ApiError::from_log(e, state.locale))?;
    Ok((StatusCode::CREATED, Json(entries)))
}

async fn delete_food(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<DeleteFoodRequest>,
) -> Result<Json<Vec<DailyLogEntry>>, ApiError> {
    let entries = state
        .service
        .remove_food_item(&state.user.uid, &date, &req.item)
        .await
        .map_err(|e| ApiError::from_log(e, state.locale))?;
    Ok(Json(entries))
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/entries", get(list_entries))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/entries/{date}/weight", put(put_weight))
        .route("/api/entries/{date}/food", post(add_food).delete(delete_food))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    service: LogService,
    user: User,
    locale: Locale,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        service,
        user: user.clone(),
        locale,
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        let head: String = key.chars().take(4).collect();
        let tail: String = key
            .chars()
            .skip(key.chars().count().saturating_sub(4))
            .collect();
        eprintln!("API key: {head}...{tail} (see api_key file in data directory)");
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. \
             Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!(uid = %user.uid, %bind, port, "server started");
    eprintln!("Serving the log of {} on http://{bind}:{port}", user.label());
    axum::serve(listener, app).await?;

    Ok(())
}
