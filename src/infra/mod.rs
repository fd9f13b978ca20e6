//! 基础设施模块
//!
//! 封装外部依赖（子进程、文件锁、Slack HTTP client、日志）

pub mod command;
pub mod lock;
pub mod logging;
pub mod slack;

pub use command::{CommandError, CommandOutput, CommandRunner};
pub use lock::{DeployLock, DeployLockGuard};
pub use slack::{SlackError, SlackNotifier};
