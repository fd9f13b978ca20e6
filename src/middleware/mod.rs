//! 请求级校验：Basic 认证与 webhook 签名

pub mod auth;
pub mod signature;

pub use auth::RequireBasicAuth;
pub use signature::verify_request;
