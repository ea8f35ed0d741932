//! Age-based cleanup of published audio

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio_util::sync::CancellationToken;

/// Periodically deletes published `.mp3` files older than a retention window
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    dir: PathBuf,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            interval,
        }
    }

    /// Sweep every `interval` until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::debug!(
            dir = %self.dir.display(),
            max_age_secs = self.max_age.as_secs(),
            "retention sweeper started"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.sweep_once().await;
                    if removed > 0 {
                        tracing::info!(removed, "expired audio removed");
                    }
                }
            }
        }

        tracing::debug!("retention sweeper stopped");
    }

    /// Remove expired files once, returning how many were deleted
    ///
    /// Errors are logged and skipped; a missing directory counts as empty.
    pub async fn sweep_once(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to list published audio");
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read published audio entry");
                    break;
                }
            };

            let path = entry.path();
            if !is_audio(&path) {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let expired = metadata.is_file()
                && metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > self.max_age);

            if !expired {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove expired audio"),
            }
        }

        removed
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "mp3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_only_expired_audio() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.mp3"), b"ID3").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let sweeper = RetentionSweeper::new(dir.path(), Duration::from_millis(10), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await, 1);

        assert!(!dir.path().join("old.mp3").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn fresh_audio_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("new.mp3"), b"ID3").unwrap();

        let sweeper = RetentionSweeper::new(dir.path(), Duration::from_secs(3600), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await, 0);
        assert!(dir.path().join("new.mp3").exists());
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = RetentionSweeper::new(dir.path().join("absent"), Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(sweeper.sweep_once().await, 0);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = RetentionSweeper::new(dir.path(), Duration::from_secs(1), Duration::from_millis(10));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(sweeper.run(shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
