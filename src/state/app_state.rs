//! 应用状态

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::infra::{CommandRunner, DeployLock, SlackNotifier};
use crate::services::{DeployExecutor, EnvironmentResolver, Notifier};

/// 应用状态
///
/// 启动时构造一次，所有 handler 通过 `Arc<AppState>` 共享，只读。
pub struct AppState {
    /// 配置
    pub config: Arc<Config>,
    /// 环境名解析
    pub resolver: EnvironmentResolver,
    /// 部署执行（持有部署锁，部署结束后发通知）
    pub executor: DeployExecutor,
    /// 部署结果通知，未配置 Slack 时为空
    pub notifier: Option<Arc<dyn Notifier>>,
    /// `enable_mutex_lock` 开启时串行处理整个 webhook 请求
    request_lock: Option<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let notifier = match config.slack.clone() {
            Some(slack) => {
                let slack = SlackNotifier::new(slack).context("Failed to create Slack client")?;
                Some(Arc::new(slack) as Arc<dyn Notifier>)
            }
            None => None,
        };

        let runner = CommandRunner::new(config.home.clone());
        let resolver =
            EnvironmentResolver::new(config.prefix.clone(), config.allow_uppercase, runner.clone());
        let executor = DeployExecutor::new(
            config.command.clone(),
            runner,
            DeployLock::new(config.lock_file.clone()),
        )
        .with_notifier(notifier.clone());
        let request_lock = config.enable_mutex_lock.then(|| Mutex::new(()));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            executor,
            notifier,
            request_lock,
        })
    }

    /// 替换通知渠道
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self.executor = self.executor.with_notifier(self.notifier.clone());
        self
    }

    /// 替换命令执行器（测试里指向假的 r10k）
    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.resolver = EnvironmentResolver::new(
            self.config.prefix.clone(),
            self.config.allow_uppercase,
            runner.clone(),
        );
        self.executor = DeployExecutor::new(
            self.config.command.clone(),
            runner,
            DeployLock::new(self.config.lock_file.clone()),
        )
        .with_notifier(self.notifier.clone());
        self
    }

    /// 开启 `enable_mutex_lock` 时返回请求级互斥锁
    pub async fn serialize_requests(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.request_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_lock_follows_config() {
        let state = AppState::new(Config::from_yaml_str("").unwrap()).unwrap();
        assert!(state.serialize_requests().await.is_none());
        assert!(state.notifier.is_none());

        let state = AppState::new(
            Config::from_yaml_str("enable_mutex_lock: true\nslack_webhook: http://127.0.0.1:9/hook")
                .unwrap(),
        )
        .unwrap();
        assert!(state.serialize_requests().await.is_some());
        assert!(state.notifier.is_some());
    }
}
