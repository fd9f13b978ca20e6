//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod health;
pub mod webhook;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// 构建完整的 API 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .merge(health::router())
        // Webhooks
        .merge(webhook::router())
        .fallback(|| async { ApiError::NotFound })
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
