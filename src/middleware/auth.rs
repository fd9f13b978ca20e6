//! HTTP Basic 认证
//!
//! 提供 `RequireBasicAuth` extractor。配置 `protected: true` 时校验
//! `Authorization: Basic ...`，否则直接放行。

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{
        header::{HeaderMap, AUTHORIZATION},
        request::Parts,
    },
};
use base64::Engine;
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::Credentials;
use crate::error::ApiError;
use crate::state::AppState;

/// Basic 认证 Extractor
///
/// ```ignore
/// async fn handler(_auth: RequireBasicAuth, State(state): State<Arc<AppState>>) { ... }
/// ```
#[derive(Debug, Clone)]
pub struct RequireBasicAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireBasicAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.credentials.as_ref() else {
            return Ok(RequireBasicAuth);
        };

        let client = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let provided = extract_basic_credentials(&parts.headers);
        let provided = provided.as_ref().map(|(u, p)| (u.as_str(), p.as_str()));
        if authorized(provided, expected) {
            tracing::info!(user = %expected.user, client = %client, "Authenticated request");
            return Ok(RequireBasicAuth);
        }

        tracing::warn!(client = %client, "Unauthenticated request");
        Err(ApiError::Unauthorized)
    }
}

/// 用户名和密码都必须完全一致；没有提供凭据视为失败
pub fn authorized(provided: Option<(&str, &str)>, expected: &Credentials) -> bool {
    match provided {
        Some((user, pass)) => {
            let user_ok = user.as_bytes().ct_eq(expected.user.as_bytes());
            let pass_ok = pass.as_bytes().ct_eq(expected.pass.as_bytes());
            bool::from(user_ok & pass_ok)
        }
        None => false,
    }
}

/// 解析 `Authorization: Basic base64(user:pass)`，scheme 不区分大小写
fn extract_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let (scheme, encoded) = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim_start()
        .split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_owned(), pass.to_owned()))
}
