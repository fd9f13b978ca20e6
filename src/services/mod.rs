//! 服务层模块
//!
//! 环境名解析、部署执行、结果通知

pub mod executor;
pub mod notify;
pub mod resolver;

pub use executor::DeployExecutor;
pub use notify::{spawn_notification, Notifier};
pub use resolver::EnvironmentResolver;
