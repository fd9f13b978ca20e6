//! 部署结果通知
//!
//! 通知是尽力而为的：在后台任务里发送，失败只记日志，不影响已经算好的 HTTP 响应。

use axum::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::domain::DeployResult;
use crate::infra::{SlackError, SlackNotifier};

/// 部署结果通知渠道
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 渠道名，用于日志
    fn name(&self) -> &'static str;

    async fn notify(&self, result: &DeployResult) -> Result<(), SlackError>;
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn notify(&self, result: &DeployResult) -> Result<(), SlackError> {
        self.post(result).await
    }
}

/// 后台发送通知
pub fn spawn_notification(
    notifier: Arc<dyn Notifier>,
    result: DeployResult,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&result).await {
            warn!(
                notifier = notifier.name(),
                target = %result.target.display_name(),
                error = %e,
                "Failed to send deploy notification"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeployTarget;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn notify(&self, result: &DeployResult) -> Result<(), SlackError> {
            self.seen.lock().await.push(result.target.name().to_string());
            Err(SlackError::NonSuccessStatus(503))
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let recording = Arc::new(Recording::default());
        let result = DeployResult::failure(DeployTarget::Module("stdlib".to_string()), "boom", None);

        spawn_notification(recording.clone(), result).await.unwrap();

        assert_eq!(*recording.seen.lock().await, vec!["stdlib".to_string()]);
    }
}
