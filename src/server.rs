//! HTTP surface of the proxy

use crate::error::CheckError;
use crate::list_fetcher::AggregatedList;
use crate::proxy_service::ProxyService;
use crate::upstream::Profile;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProxyService>,
    pub service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Body of `/api/followers/:id` and `/api/following/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub users: Vec<String>,
    pub total: usize,
    #[serde(default)]
    pub partial: bool,
}

impl From<AggregatedList> for ListResponse {
    fn from(list: AggregatedList) -> Self {
        Self {
            users: list.items,
            total: list.total,
            partial: list.partial,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError(pub CheckError);

impl From<CheckError> for ApiError {
    fn from(e: CheckError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CheckError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CheckError::NotFound => StatusCode::NOT_FOUND,
            CheckError::PrivateProfile => StatusCode::FORBIDDEN,
            CheckError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            CheckError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            CheckError::NetworkFailure(_) | CheckError::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let mut response = (
            status,
            Json(ErrorBody {
                error: self.0.user_message().to_string(),
            }),
        )
            .into_response();

        if let CheckError::Throttled {
            retry_after: Some(wait),
        } = &self.0
        {
            let secs = wait.as_secs().max(1).to_string();
            if let Ok(value) = HeaderValue::from_str(&secs) {
                response.headers_mut().insert("retry-after", value);
            }
        }

        response
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.service_name.clone(),
    })
}

async fn profile_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(handle): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let client_key = addr.ip().to_string();
    let profile = state.service.get_profile(&client_key, &handle).await?;
    Ok(Json(profile))
}

async fn followers_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse>, ApiError> {
    let client_key = addr.ip().to_string();
    let list = state.service.get_followers(&client_key, &user_id).await?;
    Ok(Json(list.into()))
}

async fn following_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse>, ApiError> {
    let client_key = addr.ip().to_string();
    let list = state.service.get_following(&client_key, &user_id).await?;
    Ok(Json(list.into()))
}

/// CORS restricted to `allowed_origins`, GET only.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/api/profile/{handle}", get(profile_handler))
        .route("/api/followers/{id}", get(followers_handler))
        .route("/api/following/{id}", get(following_handler))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}
