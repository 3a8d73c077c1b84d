use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::AppState;
use crate::core::invoker::CommandStats;
use crate::domain::model::Passport;
use crate::utils::error::{ErrorCategory, GatewayError};

/// 將 GatewayError 轉成 HTTP 回應；只有 InvalidRequest 會以 4xx 呈現
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::Request => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("❌ Request failed: {}", self.0);
        } else {
            tracing::warn!("⚠️ Rejected request: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// GET /{user_id}/passport
pub async fn passport(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Passport>, ApiError> {
    tracing::info!("📥 Passport request for {}", user_id);
    let passport = state.handler.handle(&user_id).await?;
    Ok(Json(passport))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commands: BTreeMap<String, CommandStats>,
}

/// 健康檢查，附帶各 command 的降級統計
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::debug!("Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commands: state.metrics.snapshot(),
    })
}
