//! 部署文件锁
//!
//! r10k 同时运行两次会有竞态，导致部署失败。这里用锁文件上的
//! 排他 advisory lock 让部署命令在整台机器上串行执行，多个 webhook
//! 进程之间同样有效。等待没有超时。

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// 部署锁
#[derive(Clone, Debug)]
pub struct DeployLock {
    path: PathBuf,
}

/// 持有期间独占部署锁，drop 时释放
#[derive(Debug)]
pub struct DeployLockGuard {
    file: File,
}

impl Drop for DeployLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl DeployLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 阻塞直到拿到锁
    pub fn acquire_blocking(&self) -> io::Result<DeployLockGuard> {
        lock_file(&self.path)
    }

    /// 在 blocking 线程池里等锁，不占用异步 worker
    pub async fn acquire(&self) -> io::Result<DeployLockGuard> {
        let lock = self.clone();
        tokio::task::spawn_blocking(move || lock.acquire_blocking())
            .await
            .map_err(io::Error::other)?
    }
}

fn lock_file(path: &Path) -> io::Result<DeployLockGuard> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;

    Ok(DeployLockGuard { file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_lock_is_exclusive_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/webhook.lock");

        let first = DeployLock::new(&path).acquire_blocking().unwrap();
        assert!(path.exists());

        // 另一个独立打开的文件句柄拿不到锁
        let other = File::open(&path).unwrap();
        assert!(other.try_lock_exclusive().is_err());

        drop(first);
        assert!(other.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_waiter_blocks_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DeployLock::new(dir.path().join("webhook.lock"));

        let guard = lock.acquire_blocking().unwrap();
        let (tx, rx) = mpsc::channel();
        let waiter = {
            let lock = lock.clone();
            std::thread::spawn(move || {
                let _guard = lock.acquire_blocking().unwrap();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        waiter.join().unwrap();
    }

    #[tokio::test]
    async fn test_async_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DeployLock::new(dir.path().join("webhook.lock"));
        let guard = lock.acquire().await.unwrap();
        drop(guard);
        let _again = lock.acquire().await.unwrap();
    }
}
