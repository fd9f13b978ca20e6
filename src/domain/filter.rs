//! 事件与环境过滤

use regex::Regex;

/// GitHub 创建 webhook 时发送的探测事件，始终忽略
pub const PING_EVENT: &str = "ping";

/// `ignore_environments` 中的一条规则
///
/// YAML 里 `/.../` 包裹的值也只是字符串，这里在加载配置时编译成正则。
#[derive(Clone, Debug)]
pub enum IgnoreRule {
    Literal(String),
    Pattern(Regex),
}

impl IgnoreRule {
    pub fn parse(rule: &str) -> Result<Self, regex::Error> {
        match rule.strip_prefix('/').and_then(|r| r.strip_suffix('/')) {
            Some(pattern) if !pattern.is_empty() => Regex::new(pattern).map(IgnoreRule::Pattern),
            _ => Ok(IgnoreRule::Literal(rule.to_string())),
        }
    }

    /// 正则规则在任意位置匹配即可，字面量规则要求完全相等
    pub fn matches(&self, env: &str) -> bool {
        match self {
            IgnoreRule::Literal(literal) => literal == env,
            IgnoreRule::Pattern(re) => re.is_match(env),
        }
    }
}

/// `repository_events` 配置
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EventFilter {
    /// 未配置，处理所有事件
    #[default]
    Any,
    /// 只处理列表中的事件
    Only(Vec<String>),
}

/// 是否忽略这个事件类型
pub fn should_ignore_event(event: Option<&str>, filter: &EventFilter) -> bool {
    if event == Some(PING_EVENT) {
        return true;
    }
    match filter {
        EventFilter::Any => false,
        EventFilter::Only(allowed) => !event.map_or(false, |e| allowed.iter().any(|a| a == e)),
    }
}

/// 是否跳过这个环境
pub fn should_ignore_environment(env: &str, rules: &[IgnoreRule]) -> bool {
    rules.iter().any(|rule| rule.matches(env))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(raw: &[&str]) -> Vec<IgnoreRule> {
        raw.iter().map(|r| IgnoreRule::parse(r).unwrap()).collect()
    }

    #[test]
    fn test_ping_always_ignored() {
        assert!(should_ignore_event(Some("ping"), &EventFilter::Any));
        assert!(should_ignore_event(
            Some("ping"),
            &EventFilter::Only(vec!["ping".to_string()])
        ));
    }

    #[test]
    fn test_unconfigured_allows_everything() {
        assert!(!should_ignore_event(Some("push"), &EventFilter::Any));
        assert!(!should_ignore_event(Some("release"), &EventFilter::Any));
        assert!(!should_ignore_event(None, &EventFilter::Any));
    }

    #[test]
    fn test_configured_list_is_default_deny() {
        let filter = EventFilter::Only(vec!["push".to_string(), "release".to_string()]);
        assert!(!should_ignore_event(Some("push"), &filter));
        assert!(!should_ignore_event(Some("release"), &filter));
        assert!(should_ignore_event(Some("issues"), &filter));
        assert!(should_ignore_event(Some("pus"), &filter));
        assert!(should_ignore_event(None, &filter));
    }

    #[test]
    fn test_ignore_environment_literal_and_regex() {
        let rules = rules(&["production", "/^feature-.*$/"]);
        assert!(should_ignore_environment("production", &rules));
        assert!(should_ignore_environment("feature-123", &rules));
        assert!(!should_ignore_environment("staging", &rules));
        assert!(!should_ignore_environment("production2", &rules));
    }

    #[test]
    fn test_ignore_environment_regex_is_unanchored() {
        let rules = rules(&["/bugfix/"]);
        assert!(should_ignore_environment("repo_bugfix_42", &rules));
    }

    #[test]
    fn test_ignore_environment_empty_rules() {
        assert!(!should_ignore_environment("production", &[]));
    }

    #[test]
    fn test_rule_parse() {
        assert!(matches!(IgnoreRule::parse("/a.b/").unwrap(), IgnoreRule::Pattern(_)));
        assert!(matches!(IgnoreRule::parse("//").unwrap(), IgnoreRule::Literal(_)));
        assert!(matches!(IgnoreRule::parse("/tmp").unwrap(), IgnoreRule::Literal(_)));
        assert!(IgnoreRule::parse("/(unclosed/").is_err());
    }
}
