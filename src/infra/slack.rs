//! Slack incoming-webhook 客户端
//!
//! 部署结束后发送一条带附件的消息，支持通过 HTTP 代理发送

use reqwest::{Client, Proxy};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::config::SlackConfig;
use crate::domain::DeployResult;

const ICON_EMOJI: &str = ":ocean:";
const AUTHOR: &str = "r10k for Puppet";

/// Slack 通知错误
#[derive(Debug)]
pub enum SlackError {
    /// HTTP client 构建失败（通常是代理地址无效）
    Client(reqwest::Error),
    /// 网络错误
    Network(reqwest::Error),
    /// Slack 返回非成功状态码
    NonSuccessStatus(u16),
}

impl std::fmt::Display for SlackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlackError::Client(e) => write!(f, "Failed to build HTTP client: {}", e),
            SlackError::Network(e) => write!(f, "Network error: {}", e),
            SlackError::NonSuccessStatus(code) => {
                write!(f, "Slack returned non-success status {}", code)
            }
        }
    }
}

impl std::error::Error for SlackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SlackError::Client(e) | SlackError::Network(e) => Some(e),
            SlackError::NonSuccessStatus(_) => None,
        }
    }
}

/// 消息体
#[derive(Debug, Serialize)]
pub struct SlackMessage {
    pub channel: String,
    pub username: String,
    pub icon_emoji: &'static str,
    pub text: String,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
pub struct SlackAttachment {
    pub author: &'static str,
    pub title: String,
    pub color: &'static str,
    pub text: String,
    pub fallback: String,
}

/// Slack 通知客户端
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    config: SlackConfig,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Result<Self, SlackError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(10));
        if let Some(ref proxy_url) = config.proxy_url {
            builder = builder.proxy(Proxy::all(proxy_url).map_err(SlackError::Client)?);
        }
        let client = builder.build().map_err(SlackError::Client)?;

        Ok(Self { client, config })
    }

    /// 根据部署结果构建消息
    pub fn build_message(&self, result: &DeployResult) -> SlackMessage {
        let target = result.target.display_name();
        let (color, text) = if result.is_success() {
            ("good", format!("Successfully deployed {}", target))
        } else {
            ("bad", format!("Failed to deploy {}", target))
        };

        SlackMessage {
            channel: self.config.channel.clone(),
            username: self.config.username.clone(),
            icon_emoji: ICON_EMOJI,
            text: text.clone(),
            attachments: vec![SlackAttachment {
                author: AUTHOR,
                title: format!("r10k deployment of Puppet environment {}", target),
                color,
                fallback: text.clone(),
                text,
            }],
        }
    }

    /// 发送通知
    pub async fn post(&self, result: &DeployResult) -> Result<(), SlackError> {
        let message = self.build_message(result);
        let resp = self
            .client
            .post(&self.config.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(SlackError::Network)?;

        if !resp.status().is_success() {
            return Err(SlackError::NonSuccessStatus(resp.status().as_u16()));
        }

        info!(
            channel = %self.config.channel,
            target = %result.target.display_name(),
            status = result.status.as_str(),
            "Slack notification sent"
        );
        Ok(())
    }
}
