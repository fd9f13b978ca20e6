//! 配置模块
//!
//! webhook.yaml 解析与命令行/环境变量覆盖

pub mod env;
pub mod webhook;

pub use env::RuntimeConfig;
pub use webhook::{
    CommandSettings, Config, ConfigError, Credentials, DeployStrategy, PrefixMode, SlackConfig,
    WebhookSettings,
};
