//! 日志初始化
//!
//! 控制台输出始终开启；配置了 `access_logfile` 时同时写入该文件。
//! 过滤级别取 `WEBHOOK_LOG`，其次 `RUST_LOG`，默认 `info`。

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("WEBHOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局 subscriber
///
/// 返回的 guard 必须在进程生命周期内持有，drop 时会刷新文件缓冲。
/// 重复初始化（例如测试里）会被忽略。
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, InitError> {
    let (file_layer, guard) = match log_file.and_then(split_path) {
        Some((dir, name)) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name.to_string_lossy())
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let initialized = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    if initialized.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }

    Ok(guard)
}

fn split_path(path: &Path) -> Option<(&Path, &std::ffi::OsStr)> {
    let name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Some((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        let (dir, name) = split_path(Path::new("/var/log/webhook/access.log")).unwrap();
        assert_eq!(dir, Path::new("/var/log/webhook"));
        assert_eq!(name, "access.log");

        let (dir, name) = split_path(Path::new("access.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "access.log");

        assert!(split_path(Path::new("/")).is_none());
    }
}
