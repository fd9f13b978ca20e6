//! 统一错误处理
//!
//! 提供 `ApiError` 枚举实现 `IntoResponse`。部署失败不走这里，
//! 它们由部署执行器转换成结构化的 `DeployResult`。

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::payload::PayloadError;

/// 404 响应正文（纯文本）
pub const NOT_FOUND_BODY: &str = "You shall not pass! (page not found)\n";

/// 401 质询头
pub const BASIC_AUTH_CHALLENGE: &str = r#"Basic realm="Restricted Area""#;

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 401 - Basic 认证失败（纯文本 + WWW-Authenticate）
    Unauthorized,
    /// 404 - 路由不存在（纯文本）
    NotFound,
    /// 400 - 请求体无法解析或缺少必要字段
    BadRequest(String),
    /// 500 - webhook 签名不匹配，请求立即终止
    SignatureMismatch,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, BASIC_AUTH_CHALLENGE)],
                "Not authorized\n",
            )
                .into_response(),
            ApiError::NotFound => (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response(),
            ApiError::SignatureMismatch => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Signatures didn't match!\n",
            )
                .into_response(),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("bad_request", msg)),
            )
                .into_response(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::SignatureMismatch => write!(f, "Signature mismatch"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_new() {
        let resp = ErrorResponse::new("bad_request", "Malformed payload");
        assert_eq!(resp.error, "bad_request");
        assert_eq!(resp.message, "Malformed payload");
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({ "error": "bad_request", "message": "Malformed payload" })
        );
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let resp = ApiError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_AUTH_CHALLENGE
        );
    }

    #[test]
    fn test_signature_mismatch_is_500() {
        let resp = ApiError::SignatureMismatch.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_payload_error_maps_to_bad_request() {
        let err: ApiError = PayloadError::MissingField("repository").into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
