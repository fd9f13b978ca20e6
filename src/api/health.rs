//! 健康检查
//!
//! GET /heartbeat 始终返回运行中；GET / 没有内容，返回 404

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// 心跳响应
#[derive(Debug, Serialize)]
struct HeartbeatResponse {
    status: &'static str,
    message: &'static str,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/heartbeat", get(heartbeat))
        .route("/", get(root))
}

/// GET /heartbeat
/// 无需认证
async fn heartbeat() -> impl IntoResponse {
    Json(HeartbeatResponse {
        status: "success",
        message: "running",
    })
}

async fn root() -> ApiError {
    ApiError::NotFound
}
