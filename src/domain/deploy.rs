//! 部署相关领域模型

use serde::Serialize;

/// 部署目标
///
/// 名字必须是 shell 转义之后的结果。环境名为空表示部署所有环境。
/// 序列化为 `{"branch": ...}` 或 `{"module_name": ...}`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DeployTarget {
    #[serde(rename = "branch")]
    Environment(String),
    #[serde(rename = "module_name")]
    Module(String),
}

impl DeployTarget {
    pub fn name(&self) -> &str {
        match self {
            DeployTarget::Environment(name) | DeployTarget::Module(name) => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeployTarget::Environment(_) => "environment",
            DeployTarget::Module(_) => "module",
        }
    }

    /// 用于日志和通知的显示名
    pub fn display_name(&self) -> &str {
        match self {
            DeployTarget::Environment(name) if name.is_empty() => "all environments",
            _ => self.name(),
        }
    }
}

/// 部署结果状态
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Success,
    Fail,
}

impl DeployStatus {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Success => "success",
            DeployStatus::Fail => "fail",
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            DeployStatus::Success => 200,
            DeployStatus::Fail => 500,
        }
    }
}

/// 部署结果，既是 HTTP 响应体也是通知内容
#[derive(Clone, Debug, Serialize)]
pub struct DeployResult {
    pub status: DeployStatus,
    pub message: String,
    #[serde(flatten)]
    pub target: DeployTarget,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl DeployResult {
    pub fn success(target: DeployTarget, message: impl Into<String>) -> Self {
        Self {
            status: DeployStatus::Success,
            message: message.into(),
            target,
            status_code: DeployStatus::Success.status_code(),
            trace: None,
        }
    }

    pub fn failure(target: DeployTarget, message: impl Into<String>, trace: Option<String>) -> Self {
        Self {
            status: DeployStatus::Fail,
            message: message.into(),
            target,
            status_code: DeployStatus::Fail.status_code(),
            trace,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeployStatus::Success
    }
}
