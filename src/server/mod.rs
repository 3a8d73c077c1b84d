pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::client::RemoteClient;
use crate::core::handler::PassportHandler;
use crate::core::invoker::DegradationMetrics;
use crate::domain::model::{Bookmark, Contact};

pub type GatewayHandler = PassportHandler<RemoteClient<Bookmark>, RemoteClient<Contact>>;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<GatewayHandler>,
    pub metrics: Arc<DegradationMetrics>,
}

/// 對外路由：`GET /{user_id}/passport` 與 `GET /health`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/{user_id}/passport", get(handlers::passport))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
