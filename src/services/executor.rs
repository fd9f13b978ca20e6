//! 部署执行器
//!
//! 拼接 r10k / mco 命令，持有部署锁执行，并把结果转换成 `DeployResult`。
//! 执行器从不向调用方返回错误：启动失败、锁失败、非零退出码都会变成
//! 失败的 `DeployResult`。
//!
//! 锁、命令和通知都在独立任务里运行，请求被取消（客户端断开）时部署照常
//! 跑完，锁在命令结束后才释放。

use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use super::notify::{spawn_notification, Notifier};
use crate::config::{CommandSettings, DeployStrategy};
use crate::domain::{DeployResult, DeployTarget};
use crate::infra::{CommandError, CommandOutput, CommandRunner, DeployLock};

/// 部署失败原因
#[derive(Debug)]
enum DeployError {
    Lock(std::io::Error),
    Command(CommandError),
    /// 命令以非零状态退出
    Exited(CommandOutput),
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::Lock(e) => write!(f, "Failed to acquire deploy lock: {}", e),
            DeployError::Command(e) => write!(f, "{}", e),
            DeployError::Exited(output) => write!(f, "{}\n{}", output.stdout, output.stderr),
        }
    }
}

/// 部署执行器
#[derive(Clone)]
pub struct DeployExecutor {
    settings: CommandSettings,
    runner: CommandRunner,
    lock: DeployLock,
    notifier: Option<Arc<dyn Notifier>>,
}

impl DeployExecutor {
    pub fn new(settings: CommandSettings, runner: CommandRunner, lock: DeployLock) -> Self {
        Self {
            settings,
            runner,
            lock,
            notifier: None,
        }
    }

    /// 每次部署结束后把结果发给 `notifier`
    pub fn with_notifier(mut self, notifier: Option<Arc<dyn Notifier>>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 拼接部署命令
    ///
    /// `target` 中的名字必须已经转义。空的环境名会被省略，r10k 会部署全部环境。
    pub fn command_for(&self, target: &DeployTarget) -> String {
        let settings = &self.settings;
        let mut parts: Vec<&str> = Vec::with_capacity(8);
        parts.extend(settings.command_prefix.as_deref());

        match (&settings.strategy, target) {
            (DeployStrategy::Mcollective { arguments }, DeployTarget::Environment(name)) => {
                parts.extend(["mco", "r10k", "deploy", name.as_str()]);
                parts.extend(arguments.as_deref());
            }
            (DeployStrategy::Mcollective { arguments }, DeployTarget::Module(name)) => {
                parts.extend(["mco", "r10k", "deploy_module", name.as_str()]);
                parts.extend(arguments.as_deref());
            }
            (DeployStrategy::R10k, DeployTarget::Environment(name)) => {
                parts.extend(["r10k", "deploy", "environment", name.as_str()]);
                parts.extend(settings.r10k_deploy_arguments.as_deref());
            }
            (DeployStrategy::R10k, DeployTarget::Module(name)) => {
                parts.extend(["r10k", "deploy", "module", name.as_str()]);
            }
        }

        parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 执行部署
    ///
    /// 等锁没有超时：正在运行的 r10k 挂住时，后续部署会一直等待。
    /// 返回的 future 被丢弃时，后台任务继续持锁直到命令结束，并照常发通知。
    pub async fn deploy(&self, target: DeployTarget) -> DeployResult {
        let executor = self.clone();
        let task_target = target.clone();
        let handle = tokio::spawn(async move {
            let result = executor.run(task_target).await;
            if let Some(notifier) = &executor.notifier {
                spawn_notification(Arc::clone(notifier), result.clone());
            }
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    kind = target.kind(),
                    target = %target.display_name(),
                    error = %e,
                    "Deploy task aborted"
                );
                DeployResult::failure(target, format!("Deploy task aborted: {}", e), None)
            }
        }
    }

    async fn run(&self, target: DeployTarget) -> DeployResult {
        let command = self.command_for(&target);
        info!(
            kind = target.kind(),
            target = %target.display_name(),
            command = %command,
            "Starting deploy"
        );

        match self.run_locked(&command).await {
            Ok(output) => {
                let message = format!("triggered: {}\n{}\n{}", command, output.stdout, output.stderr);
                info!(
                    kind = target.kind(),
                    target = %target.display_name(),
                    message = %message,
                    "Deploy succeeded"
                );
                DeployResult::success(target, message)
            }
            Err(e) => {
                let trace = match &e {
                    DeployError::Exited(output) => {
                        format!("command: {}\nexit status: {}", command, output.status)
                    }
                    _ => format!("command: {}", command),
                };
                error!(
                    kind = target.kind(),
                    target = %target.display_name(),
                    error = %e,
                    trace = %trace,
                    "Deploy failed"
                );
                DeployResult::failure(target, e.to_string(), Some(trace))
            }
        }
    }

    async fn run_locked(&self, command: &str) -> Result<CommandOutput, DeployError> {
        let _guard = self.lock.acquire().await.map_err(DeployError::Lock)?;
        let output = self
            .runner
            .run_shell(command)
            .await
            .map_err(DeployError::Command)?;

        if output.success() {
            Ok(output)
        } else {
            Err(DeployError::Exited(output))
        }
    }
}
