//! 领域模型模块
//!
//! 纯数据结构与纯函数，不依赖 axum/tokio

pub mod deploy;
pub mod filter;
pub mod payload;
pub mod sanitize;

// Re-exports for convenience
pub use deploy::{DeployResult, DeployStatus, DeployTarget};
pub use filter::{should_ignore_environment, should_ignore_event, EventFilter, IgnoreRule};
pub use payload::{InboundNotification, PayloadError};
pub use sanitize::sanitize;
