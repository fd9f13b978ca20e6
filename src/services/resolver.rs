//! 环境名解析
//!
//! 把 payload 里的分支名和可选前缀合成最终的 r10k 环境名。
//! 前缀和分支名都在这里转义，返回值可以直接拼进命令行。
//! 返回空串表示部署所有环境。

use tracing::{debug, warn};

use crate::config::PrefixMode;
use crate::domain::{sanitize, InboundNotification};
use crate::infra::CommandRunner;

/// 环境名解析器
#[derive(Clone, Debug)]
pub struct EnvironmentResolver {
    prefix: PrefixMode,
    allow_uppercase: bool,
    runner: CommandRunner,
}

impl EnvironmentResolver {
    pub fn new(prefix: PrefixMode, allow_uppercase: bool, runner: CommandRunner) -> Self {
        Self {
            prefix,
            allow_uppercase,
            runner,
        }
    }

    /// 解析环境名
    pub async fn resolve(&self, notification: &InboundNotification) -> String {
        let branch = notification
            .branch()
            .filter(|b| !b.is_empty())
            .map(|b| sanitize(&b));
        let prefix = self
            .prefix(notification)
            .await
            .filter(|p| !p.is_empty())
            .map(|p| sanitize(&p));

        let environment = combine(prefix.as_deref(), branch.as_deref(), self.allow_uppercase);
        debug!(
            prefix = ?prefix,
            branch = ?branch,
            environment = %environment,
            "Resolved environment"
        );
        environment
    }

    /// 计算前缀（未转义）
    async fn prefix(&self, notification: &InboundNotification) -> Option<String> {
        match &self.prefix {
            PrefixMode::None => None,
            PrefixMode::Literal(prefix) => Some(prefix.clone()),
            PrefixMode::Repo => notification.repo_name().map(str::to_string),
            PrefixMode::User => notification.repo_owner().map(str::to_string),
            PrefixMode::Command(command) => self.prefix_from_command(command, notification).await,
        }
    }

    /// 运行前缀命令：stdin 写入 payload JSON，取输出第一行
    ///
    /// 任何失败都当作没有前缀。
    async fn prefix_from_command(
        &self,
        command: &str,
        notification: &InboundNotification,
    ) -> Option<String> {
        let input = match serde_json::to_vec(notification.payload()) {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "Failed to serialize payload for prefix command");
                return None;
            }
        };

        let output = match self.runner.run_with_stdin(command, &input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(command, error = %e, "Prefix command failed");
                return None;
            }
        };
        if !output.success() {
            warn!(command, status = %output.status, "Prefix command exited with non-zero status");
        }

        let line = first_line(&output.stdout);
        if line.is_none() {
            warn!(command, "Prefix command produced no output, using no prefix");
        }
        line
    }
}

fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .next()
        .map(|line| line.trim_end_matches('\r').to_string())
}

/// 合成环境名
///
/// 前缀或分支名任一为空时只使用分支名（可能为空，表示全部环境）。
pub fn combine(prefix: Option<&str>, branch: Option<&str>, allow_uppercase: bool) -> String {
    let environment = match (prefix, branch) {
        (Some(prefix), Some(branch)) if !prefix.is_empty() && !branch.is_empty() => {
            format!("{}_{}", prefix, branch)
        }
        (_, branch) => branch.unwrap_or_default().to_string(),
    };

    if allow_uppercase {
        environment
    } else {
        environment.to_lowercase()
    }
}
