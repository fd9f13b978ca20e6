//! Webhook API
//!
//! POST /module  - 部署单个模块
//! POST /payload - 根据 push 事件部署环境
//!
//! 处理顺序：Basic 认证 → 事件过滤 → 原始请求体验签 → 解析 → 转义/解析环境名 →
//! 环境过滤 → 部署 → 通知。认证和验签失败时不会执行任何部署。

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::domain::{
    sanitize, should_ignore_environment, should_ignore_event, DeployResult, DeployStatus,
    DeployTarget, InboundNotification,
};
use crate::error::ApiResult;
use crate::middleware::{verify_request, RequireBasicAuth};
use crate::state::AppState;

/// 事件类型请求头
pub const EVENT_HEADER: &str = "x-github-event";

/// 请求体上限，与 GitHub webhook payload 的上限一致（25 MB）
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// 创建 webhook 路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/module", post(deploy_module))
        .route("/payload", post(deploy_payload))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

impl IntoResponse for DeployResult {
    fn into_response(self) -> Response {
        let status = match self.status {
            DeployStatus::Success => StatusCode::OK,
            DeployStatus::Fail => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// 事件过滤 + 验签 + 解析，返回 `None` 表示该事件被忽略
fn accept(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<Option<InboundNotification>> {
    let event = header_str(headers, EVENT_HEADER);
    if should_ignore_event(event, &state.config.repository_events) {
        info!(event = ?event, "Ignoring webhook event");
        return Ok(None);
    }

    verify_request(headers, body, state.config.github_secret.as_deref())?;

    let notification =
        InboundNotification::parse(body, header_str(headers, CONTENT_TYPE.as_str()))?;
    Ok(Some(notification))
}

/// 部署模块
///
/// POST /module
async fn deploy_module(
    _auth: RequireBasicAuth,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let _serial = state.serialize_requests().await;

    let Some(notification) = accept(&state, &headers, &body)? else {
        return Ok(StatusCode::OK.into_response());
    };

    let module = sanitize(&notification.module_name()?);
    Ok(state.executor.deploy(DeployTarget::Module(module)).await.into_response())
}

/// 部署环境
///
/// POST /payload
async fn deploy_payload(
    _auth: RequireBasicAuth,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let _serial = state.serialize_requests().await;

    let Some(notification) = accept(&state, &headers, &body)? else {
        return Ok(StatusCode::OK.into_response());
    };

    let environment = state.resolver.resolve(&notification).await;
    if should_ignore_environment(&environment, &state.config.ignore_environments) {
        info!(
            environment = %environment,
            "Skipping deployment according to ignore_environments"
        );
        return Ok(StatusCode::OK.into_response());
    }

    Ok(state
        .executor
        .deploy(DeployTarget::Environment(environment))
        .await
        .into_response())
}
