//! webhook.yaml 配置
//!
//! `WebhookSettings` 是 YAML 的原始形状；启动时转换成不可变的 `Config`，
//! 正则规则、前缀模式、部署命令策略都在这一步确定。

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::env::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_LOCK_FILE, DEFAULT_PID_FILE, DEFAULT_PORT,
};
use crate::domain::filter::{EventFilter, IgnoreRule};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("ignore_environments rule `{rule}` is not a valid regex: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
    #[error("prefix is set to run a command but prefix_command is missing")]
    MissingPrefixCommand,
    #[error("unsupported prefix value: {0:?}")]
    InvalidPrefix(serde_yaml::Value),
    #[error("protected is enabled but user/pass are missing")]
    MissingCredentials,
}

/// YAML 中既可以写单个值也可以写列表的字段
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// webhook.yaml 原始结构
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub access_logfile: Option<PathBuf>,
    /// 子进程的 HOME
    pub home: Option<String>,

    pub protected: Option<bool>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub github_secret: Option<String>,

    pub repository_events: Option<OneOrMany>,
    pub ignore_environments: Option<Vec<String>>,

    /// `:repo` / `:user` / `:command` / `true` / 字面量
    pub prefix: Option<serde_yaml::Value>,
    pub prefix_command: Option<String>,
    pub allow_uppercase: Option<bool>,

    pub use_mcollective: Option<bool>,
    pub mco_arguments: Option<String>,
    pub r10k_deploy_arguments: Option<String>,
    pub command_prefix: Option<String>,
    pub enable_mutex_lock: Option<bool>,

    pub slack_webhook: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_username: Option<String>,
    pub slack_proxy_url: Option<String>,

    pub lock_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
}

/// 环境名前缀模式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrefixMode {
    None,
    /// `repository.name`
    Repo,
    /// `repository.owner.login`
    User,
    /// 运行外部命令，stdin 为 payload JSON，输出第一行作为前缀
    Command(String),
    Literal(String),
}

impl PrefixMode {
    fn from_setting(
        value: Option<&serde_yaml::Value>,
        command: Option<&str>,
    ) -> Result<Self, ConfigError> {
        use serde_yaml::Value;

        let command_mode = || {
            command
                .filter(|c| !c.trim().is_empty())
                .map(|c| PrefixMode::Command(c.to_string()))
                .ok_or(ConfigError::MissingPrefixCommand)
        };

        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(PrefixMode::None),
            Some(Value::Bool(true)) => command_mode(),
            Some(Value::String(s)) => match s.strip_prefix(':').unwrap_or(s.as_str()) {
                "repo" => Ok(PrefixMode::Repo),
                "user" => Ok(PrefixMode::User),
                "command" => command_mode(),
                "" => Ok(PrefixMode::None),
                _ => Ok(PrefixMode::Literal(s.clone())),
            },
            Some(Value::Number(n)) => Ok(PrefixMode::Literal(n.to_string())),
            Some(other) => Err(ConfigError::InvalidPrefix(other.clone())),
        }
    }
}

/// 部署命令策略
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeployStrategy {
    /// 直接调用 `r10k`，需要以 r10k 的用户（通常是 root）运行
    R10k,
    /// 通过 `mco r10k` 广播给所有 Puppet master
    Mcollective { arguments: Option<String> },
}

/// 部署命令相关配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSettings {
    pub strategy: DeployStrategy,
    /// 例如 `sudo`
    pub command_prefix: Option<String>,
    pub r10k_deploy_arguments: Option<String>,
}

/// Basic 认证凭据
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

/// Slack 通知配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub channel: String,
    pub username: String,
    pub proxy_url: Option<String>,
}

/// 运行时配置，启动后只读
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub access_logfile: Option<PathBuf>,
    pub home: Option<String>,
    /// `protected: true` 时才有值
    pub credentials: Option<Credentials>,
    pub github_secret: Option<String>,
    pub repository_events: EventFilter,
    pub ignore_environments: Vec<IgnoreRule>,
    pub prefix: PrefixMode,
    pub allow_uppercase: bool,
    pub command: CommandSettings,
    pub enable_mutex_lock: bool,
    pub slack: Option<SlackConfig>,
    pub lock_file: PathBuf,
    pub pid_file: PathBuf,
}

impl Config {
    /// 从 YAML 文件加载
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: WebhookSettings = if raw.trim().is_empty() {
            WebhookSettings::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        Self::try_from(settings)
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

impl TryFrom<WebhookSettings> for Config {
    type Error = ConfigError;

    fn try_from(s: WebhookSettings) -> Result<Self, Self::Error> {
        let credentials = if s.protected.unwrap_or(false) {
            match (s.user, s.pass) {
                (Some(user), Some(pass)) => Some(Credentials { user, pass }),
                _ => return Err(ConfigError::MissingCredentials),
            }
        } else {
            None
        };

        let repository_events = match s.repository_events {
            None => EventFilter::Any,
            Some(OneOrMany::One(event)) => EventFilter::Only(vec![event]),
            Some(OneOrMany::Many(events)) => EventFilter::Only(events),
        };

        let ignore_environments = s
            .ignore_environments
            .unwrap_or_default()
            .iter()
            .map(|rule| {
                IgnoreRule::parse(rule).map_err(|source| ConfigError::InvalidPattern {
                    rule: rule.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prefix = PrefixMode::from_setting(s.prefix.as_ref(), s.prefix_command.as_deref())?;

        let strategy = if s.use_mcollective.unwrap_or(false) {
            DeployStrategy::Mcollective {
                arguments: s.mco_arguments,
            }
        } else {
            DeployStrategy::R10k
        };

        let slack = s.slack_webhook.map(|webhook_url| SlackConfig {
            webhook_url,
            channel: s.slack_channel.unwrap_or_else(|| "#default".to_string()),
            username: s.slack_username.unwrap_or_else(|| "r10k".to_string()),
            proxy_url: s.slack_proxy_url,
        });

        Ok(Config {
            bind_address: s
                .bind_address
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: s.port.unwrap_or(DEFAULT_PORT),
            access_logfile: s.access_logfile,
            home: s.home,
            credentials,
            github_secret: s.github_secret.filter(|secret| !secret.is_empty()),
            repository_events,
            ignore_environments,
            prefix,
            allow_uppercase: s.allow_uppercase.unwrap_or(false),
            command: CommandSettings {
                strategy,
                command_prefix: s.command_prefix,
                r10k_deploy_arguments: s.r10k_deploy_arguments,
            },
            enable_mutex_lock: s.enable_mutex_lock.unwrap_or(false),
            slack,
            lock_file: s.lock_file.unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE)),
            pid_file: s.pid_file.unwrap_or_else(|| PathBuf::from(DEFAULT_PID_FILE)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 8088);
        assert!(config.credentials.is_none());
        assert_eq!(config.repository_events, EventFilter::Any);
        assert!(config.ignore_environments.is_empty());
        assert_eq!(config.prefix, PrefixMode::None);
        assert_eq!(config.command.strategy, DeployStrategy::R10k);
        assert!(config.slack.is_none());
        assert_eq!(config.lock_file, PathBuf::from(DEFAULT_LOCK_FILE));
        assert_eq!(config.pid_file, PathBuf::from(DEFAULT_PID_FILE));
    }

    #[test]
    fn test_full_config() {
        let yaml = r##"
port: 8099
protected: true
user: puppet
pass: puppet
github_secret: s3cret
repository_events: push
ignore_environments:
  - production
  - /^feature-.*$/
prefix: ":repo"
allow_uppercase: true
use_mcollective: true
mco_arguments: "--dt 30"
command_prefix: umask 0022;
slack_webhook: https://hooks.slack.com/services/x
slack_channel: "#deploys"
"##;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.port, 8099);
        assert_eq!(
            config.credentials,
            Some(Credentials {
                user: "puppet".to_string(),
                pass: "puppet".to_string()
            })
        );
        assert_eq!(config.github_secret.as_deref(), Some("s3cret"));
        assert_eq!(
            config.repository_events,
            EventFilter::Only(vec!["push".to_string()])
        );
        assert_eq!(config.ignore_environments.len(), 2);
        assert_eq!(config.prefix, PrefixMode::Repo);
        assert!(config.allow_uppercase);
        assert_eq!(
            config.command.strategy,
            DeployStrategy::Mcollective {
                arguments: Some("--dt 30".to_string())
            }
        );
        let slack = config.slack.unwrap();
        assert_eq!(slack.channel, "#deploys");
        assert_eq!(slack.username, "r10k");
    }

    #[test]
    fn test_prefix_modes() {
        let mode = |yaml: &str| Config::from_yaml_str(yaml).map(|c| c.prefix);

        assert_eq!(mode("prefix: user").unwrap(), PrefixMode::User);
        assert_eq!(mode("prefix: false").unwrap(), PrefixMode::None);
        assert_eq!(mode("prefix: ~").unwrap(), PrefixMode::None);
        assert_eq!(
            mode("prefix: puppet").unwrap(),
            PrefixMode::Literal("puppet".to_string())
        );
        assert_eq!(
            mode("prefix: true\nprefix_command: /usr/local/bin/prefix").unwrap(),
            PrefixMode::Command("/usr/local/bin/prefix".to_string())
        );
        assert!(matches!(
            mode("prefix: :command"),
            Err(ConfigError::MissingPrefixCommand)
        ));
    }

    #[test]
    fn test_repository_events_list() {
        let config = Config::from_yaml_str("repository_events: [push, release]").unwrap();
        assert_eq!(
            config.repository_events,
            EventFilter::Only(vec!["push".to_string(), "release".to_string()])
        );
    }

    #[test]
    fn test_invalid_ignore_pattern_rejected() {
        let err = Config::from_yaml_str("ignore_environments: ['/(oops/']").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_protected_requires_credentials() {
        let err = Config::from_yaml_str("protected: true\nuser: puppet").unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn test_null_values_tolerated() {
        let config = Config::from_yaml_str("ignore_environments:\nprotected:\nslack_webhook:").unwrap();
        assert!(config.ignore_environments.is_empty());
        assert!(config.credentials.is_none());
        assert!(config.slack.is_none());
    }

    #[test]
    fn test_port_override() {
        let config = Config::from_yaml_str("port: 8088").unwrap().with_port(Some(9999));
        assert_eq!(config.port, 9999);
    }
}
