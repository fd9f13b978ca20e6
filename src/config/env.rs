//! 命令行与环境变量覆盖

use std::env;
use std::path::PathBuf;

/// 运行时参数（命令行 / 环境变量）
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// `--config <path>`
    pub config_path: Option<PathBuf>,
    /// `--port <port>`
    pub port_override: Option<u16>,
}

impl RuntimeConfig {
    /// 配置文件路径：命令行 > `WEBHOOK_CONFIG` > 默认路径
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .or_else(|| env::var_os("WEBHOOK_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_CONFIG_PATH))
    }

    /// 端口覆盖：命令行 > `PORT`
    pub fn port(&self) -> Option<u16> {
        self.port_override
            .or_else(|| env::var("PORT").ok().and_then(|v| v.parse().ok()))
    }
}

/// 常量
pub mod constants {
    /// 默认配置文件
    pub const DEFAULT_CONFIG_PATH: &str = "/etc/webhook.yaml";

    /// 默认锁文件
    pub const DEFAULT_LOCK_FILE: &str = "/var/run/webhook/webhook.lock";

    /// 默认 PID 文件
    pub const DEFAULT_PID_FILE: &str = "/var/run/webhook/webhook.pid";

    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

    pub const DEFAULT_PORT: u16 = 8088;

    /// 子进程使用的 PATH，覆盖常见的 Puppet 安装位置
    pub const COMMAND_PATH: &str =
        "/sbin:/usr/sbin:/bin:/usr/bin:/opt/puppetlabs/puppet/bin:/opt/puppet/bin:/usr/local/bin";

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_from_env() {
        env::set_var("WEBHOOK_CONFIG", "/srv/webhook.yaml");
        assert_eq!(
            RuntimeConfig::default().config_path(),
            PathBuf::from("/srv/webhook.yaml")
        );

        env::remove_var("WEBHOOK_CONFIG");
        assert_eq!(
            RuntimeConfig::default().config_path(),
            PathBuf::from(constants::DEFAULT_CONFIG_PATH)
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let runtime = RuntimeConfig {
            config_path: Some(PathBuf::from("/tmp/hook.yaml")),
            port_override: Some(9000),
        };
        assert_eq!(runtime.config_path(), PathBuf::from("/tmp/hook.yaml"));
        assert_eq!(runtime.port(), Some(9000));
    }
}
