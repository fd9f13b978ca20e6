//! Webhook payload 解析
//!
//! 不同 Git 托管平台的 push 事件结构各不相同，这里把它们统一成
//! 分支名或模块名。返回值都是未转义的原始文本。

use serde_json::Value;
use thiserror::Error;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 分支名可能出现的位置，按优先级排列 (平台, JSON pointer)
const BRANCH_SOURCES: &[(&str, &str)] = &[
    ("github/gitlab", "/ref"),
    ("stash", "/refChanges/0/refId"),
    ("bitbucket", "/push/changes/0/new/name"),
    ("tfs", "/resource/refUpdates/0/name"),
    // tag 发布事件没有 ref
    ("github release", "/repository/default_branch"),
];

/// payload 解析错误
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
}

/// 一次 webhook 通知
#[derive(Debug, Clone)]
pub struct InboundNotification {
    payload: Value,
}

impl InboundNotification {
    /// 从原始请求体构造
    ///
    /// 表单编码的请求体会先解码（`payload=<json>` 或整段编码的 JSON）。
    /// 签名校验必须在调用这个函数之前完成。
    pub fn parse(body: &[u8], content_type: Option<&str>) -> Result<Self, PayloadError> {
        let payload = if content_type.map_or(false, is_form_encoded) {
            serde_json::from_str(&decode_form_body(body))?
        } else {
            serde_json::from_slice(body)?
        };

        Ok(Self { payload })
    }

    pub fn from_value(payload: Value) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 仓库名（`repository.name`）
    pub fn repo_name(&self) -> Option<&str> {
        self.payload
            .pointer("/repository/name")
            .and_then(Value::as_str)
    }

    /// 仓库所有者（`repository.owner.login`）
    pub fn repo_owner(&self) -> Option<&str> {
        self.payload
            .pointer("/repository/owner/login")
            .and_then(Value::as_str)
    }

    /// 提取分支名，去掉 `refs/heads/`
    ///
    /// 找不到时返回 `None`，表示部署所有环境。
    pub fn branch(&self) -> Option<String> {
        BRANCH_SOURCES.iter().find_map(|(provider, pointer)| {
            let found = self.payload.pointer(pointer).and_then(Value::as_str)?;
            tracing::debug!(provider, raw = %found, "Found branch in payload");
            Some(found.replacen("refs/heads/", "", 1))
        })
    }

    /// 提取模块名
    ///
    /// BitBucket 会把特殊字符转换后放进 `full_name`，优先使用；
    /// 否则使用 GitHub 的 `repository.name`。
    pub fn module_name(&self) -> Result<String, PayloadError> {
        let repository = self
            .payload
            .get("repository")
            .filter(|r| r.is_object())
            .ok_or(PayloadError::MissingField("repository"))?;

        if let Some(full_name) = repository.get("full_name") {
            let full_name = full_name
                .as_str()
                .ok_or(PayloadError::MissingField("repository.full_name"))?;
            return Ok(strip_full_name(full_name).to_string());
        }

        let name = repository
            .get("name")
            .and_then(Value::as_str)
            .ok_or(PayloadError::MissingField("repository.name"))?;
        Ok(strip_through_last_hyphen(name).to_string())
    }
}

/// `owner/project-module` -> `module`
///
/// 只有最后一个 `-` 出现在某个 `/` 之后才截断，否则原样返回。
fn strip_full_name(full_name: &str) -> &str {
    match (full_name.find('/'), full_name.rfind('-')) {
        (Some(slash), Some(hyphen)) if hyphen > slash => &full_name[hyphen + 1..],
        _ => full_name,
    }
}

/// `puppetlabs-stdlib` -> `stdlib`
fn strip_through_last_hyphen(name: &str) -> &str {
    name.rfind('-').map_or(name, |i| &name[i + 1..])
}

fn is_form_encoded(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map_or(false, |essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// 表单请求体解码
///
/// 支持 `payload=<json>`，以及 Gitorious 那种整段百分号编码、没有字段名的 JSON。
fn decode_form_body(body: &[u8]) -> String {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body)
        .into_owned()
        .collect();

    if let Some((_, value)) = pairs.iter().find(|(key, _)| key == "payload") {
        return value.clone();
    }
    match pairs.as_slice() {
        [(key, value)] if value.is_empty() => key.clone(),
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}
