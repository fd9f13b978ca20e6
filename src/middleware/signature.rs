//! Webhook 签名校验
//!
//! 对原始请求体计算 HMAC，与 `X-Hub-Signature-256`（`sha256=<hex>`）或
//! `X-Hub-Signature`（`sha1=<hex>`）比较。必须在解析请求体之前调用。

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::ApiError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_256_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// `sha1=<hex>`
pub fn sign_sha1(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha1={}", hex::encode(mac.finalize().into_bytes())))
}

/// `sha256=<hex>`
pub fn sign_sha256(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// 常量时间比较签名，算法由 `provided` 的前缀决定
pub fn verify_signature(body: &[u8], secret: &str, provided: &str) -> bool {
    let expected = if provided.starts_with("sha256=") {
        sign_sha256(body, secret)
    } else {
        sign_sha1(body, secret)
    };

    match expected {
        Some(expected) => bool::from(expected.as_bytes().ct_eq(provided.as_bytes())),
        None => false,
    }
}

/// 校验请求签名，未配置 secret 时跳过
pub fn verify_request(headers: &HeaderMap, body: &[u8], secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let provided = headers
        .get(SIGNATURE_256_HEADER)
        .or_else(|| headers.get(SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(provided) if verify_signature(body, secret, provided) => Ok(()),
        Some(_) => {
            tracing::warn!("Webhook signature mismatch");
            Err(ApiError::SignatureMismatch)
        }
        None => {
            tracing::warn!("Webhook signature header missing");
            Err(ApiError::SignatureMismatch)
        }
    }
}
