//! Shell 转义
//!
//! 分支名、模块名都来自网络请求，拼进部署命令前必须经过这里。
//! 转义规则与 POSIX shell 一致：安全字符原样保留，其余字符加反斜杠，
//! 换行写成 `'\n'`，空串写成 `''`。

use std::borrow::Cow;

/// 不需要转义的字符
fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@')
}

/// 纯函数版本：返回可以直接拼进命令行的单个 shell 词
pub fn shell_escape(input: &str) -> Cow<'_, str> {
    if input.is_empty() {
        return Cow::Borrowed("''");
    }
    if input.chars().all(is_shell_safe) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() * 2);
    for c in input.chars() {
        if c == '\n' {
            escaped.push_str("'\n'");
        } else {
            if !is_shell_safe(c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}

/// 转义并在内容被修改时记录日志
///
/// 被修改通常意味着 payload 可疑（分支名里带 `;`、空格之类），不是错误。
pub fn sanitize(input: &str) -> String {
    let sanitized = shell_escape(input);
    if sanitized != input {
        tracing::info!(
            raw = %input,
            sanitized = %sanitized,
            "module or branch name had to be escaped"
        );
    }
    sanitized.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn echo_through_shell(word: &str) -> String {
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("printf %s {}", word))
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap()
    }

    #[test]
    fn test_safe_strings_untouched() {
        for s in ["production", "feature/JIRA-12", "v1.2.3", "user@host:path,+x"] {
            assert_eq!(sanitize(s), s);
            assert_eq!(sanitize(&sanitize(s)), s);
        }
    }

    #[test]
    fn test_empty_is_quoted() {
        assert_eq!(sanitize(""), "''");
    }

    #[test]
    fn test_metacharacters_escaped() {
        assert_eq!(shell_escape("a b"), "a\\ b");
        assert_eq!(shell_escape(";yes"), "\\;yes");
        assert_eq!(shell_escape("$(id)"), "\\$\\(id\\)");
        assert_eq!(shell_escape("a\nb"), "a'\n'b");
    }

    #[test]
    fn test_injection_becomes_single_literal() {
        let raw = "; rm -rf *;";
        let word = sanitize(raw);
        assert_eq!(echo_through_shell(&word), raw);
    }

    #[test]
    fn test_quotes_and_newlines_round_trip_through_shell() {
        let raw = "it's \"quoted\"\n`whoami` & $HOME";
        assert_eq!(echo_through_shell(&sanitize(raw)), raw);
    }

    #[test]
    fn test_escaped_halves_concatenate() {
        let word = format!("{}_{}", sanitize("my repo"), sanitize("a;b"));
        assert_eq!(echo_through_shell(&word), "my repo_a;b");
    }
}
