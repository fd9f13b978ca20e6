//! 命令执行器
//!
//! 所有外部命令都通过 `sh -c` 执行，统一设置 PATH / HOME，
//! 并捕获 stdout / stderr / 退出码。

use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use crate::config::env::constants::COMMAND_PATH;

/// 命令执行器
#[derive(Clone, Debug)]
pub struct CommandRunner {
    search_path: String,
    home: Option<String>,
}

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 写入 stdin 失败
    StdinFailed(std::io::Error),
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::StdinFailed(e) => write!(f, "Failed to write command input: {}", e),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e)
            | CommandError::StdinFailed(e)
            | CommandError::WaitFailed(e) => Some(e),
        }
    }
}

/// 命令执行结果
#[derive(Debug)]
pub struct CommandOutput {
    /// 退出状态
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl CommandRunner {
    /// 使用默认 PATH
    pub fn new(home: Option<String>) -> Self {
        Self {
            search_path: COMMAND_PATH.to_string(),
            home,
        }
    }

    /// 自定义 PATH（测试时指向临时目录里的假命令）
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = search_path.into();
        self
    }

    fn shell(&self, command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .env("PATH", &self.search_path)
            .kill_on_drop(false);
        if let Some(ref home) = self.home {
            cmd.env("HOME", home);
        }
        cmd
    }

    /// 执行 shell 命令并捕获输出
    pub async fn run_shell(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let output = self
            .shell(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(CommandError::SpawnFailed)?;

        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// 执行 shell 命令，把 `input` 写入 stdin
    pub async fn run_with_stdin(
        &self,
        command: &str,
        input: &[u8],
    ) -> Result<CommandOutput, CommandError> {
        let mut child = self
            .shell(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CommandError::SpawnFailed)?;

        // 单独写 stdin，避免子进程输出塞满管道时互相等待
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            tokio::spawn(async move {
                let result = stdin.write_all(&input).await;
                drop(stdin);
                result
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(CommandError::WaitFailed)?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // 子进程不读 stdin 就退出是正常情况
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    warn!(command, "Command exited without reading its input");
                }
                Ok(Err(e)) => return Err(CommandError::StdinFailed(e)),
                Err(e) => return Err(CommandError::StdinFailed(std::io::Error::other(e))),
            }
        }

        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_shell_success() {
        let output = CommandRunner::default()
            .run_shell("echo hello; echo oops >&2")
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_run_shell_exit_code() {
        let output = CommandRunner::default().run_shell("exit 3").await.unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_run_shell_sets_home() {
        let output = CommandRunner::new(Some("/srv/r10k".to_string()))
            .run_shell("printf %s \"$HOME\"")
            .await
            .unwrap();
        assert_eq!(output.stdout, "/srv/r10k");
    }

    #[tokio::test]
    async fn test_run_with_stdin() {
        let output = CommandRunner::default()
            .run_with_stdin("cat", b"{\"ref\":\"main\"}")
            .await
            .unwrap();
        assert_eq!(output.stdout, "{\"ref\":\"main\"}");
    }

    #[tokio::test]
    async fn test_run_with_stdin_ignored_input() {
        let output = CommandRunner::default()
            .run_with_stdin("echo done", &vec![b'x'; 1 << 20])
            .await
            .unwrap();
        assert_eq!(output.stdout, "done\n");
    }
}
