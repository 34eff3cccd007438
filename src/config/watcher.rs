//! Hot reload of client defaults from a TOML file.
//!
//! ```text
//! notify thread ──(raw events)──▶ debounce task ──(changed configs)──▶ update_rx
//! ```
//!
//! One editor save can fire several modify events, some of them while the
//! file is still truncated. The debounce task waits until the file has been
//! quiet for `settle` before reading it, and only publishes configs that
//! differ from the last one it saw.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ClientConfig;

const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

pub struct ConfigWatcher {
    path: PathBuf,
    settle: Duration,
    update_tx: mpsc::UnboundedSender<ClientConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ClientConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                settle: DEFAULT_SETTLE,
                update_tx,
            },
            update_rx,
        )
    }

    /// Quiet period required after the last file event before reloading.
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Start watching. Must be called inside a tokio runtime; the returned
    /// handle must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        let current = load_config(&self.path).ok();
        tracing::info!(path = ?self.path, settle_ms = self.settle.as_millis() as u64, "Config watcher started");
        tokio::spawn(debounce_reloads(self, event_rx, current));

        Ok(watcher)
    }
}

async fn debounce_reloads(
    watcher: ConfigWatcher,
    mut events: mpsc::UnboundedReceiver<()>,
    mut current: Option<ClientConfig>,
) {
    while events.recv().await.is_some() {
        let mut coalesced = 1u32;
        loop {
            match tokio::time::timeout(watcher.settle, events.recv()).await {
                Ok(Some(())) => coalesced += 1,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        match load_config(&watcher.path) {
            Ok(config) if current.as_ref() == Some(&config) => {
                tracing::debug!(path = ?watcher.path, coalesced, "Config file touched, contents unchanged");
            }
            Ok(config) => {
                tracing::info!(path = ?watcher.path, coalesced, "Config reloaded");
                current = Some(config.clone());
                if watcher.update_tx.send(config).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current defaults");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("orchestrator-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_file_fails_to_watch() {
        let path = std::env::temp_dir().join("orchestrator-watch-missing/none.toml");
        let (watcher, _rx) = ConfigWatcher::new(&path);
        assert!(watcher.run().is_err());
    }

    #[tokio::test]
    async fn test_burst_of_writes_publishes_final_config_once() {
        let path = temp_config("watch-burst", "timeout_ms = 1000\n");
        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _handle = watcher.settle(Duration::from_millis(300)).run().unwrap();

        std::fs::write(&path, "").unwrap();
        std::fs::write(&path, "timeout_ms = 1500\n").unwrap();
        std::fs::write(&path, "timeout_ms = 2000\nauth_scheme = \"Bearer\"\n").unwrap();

        let reloaded = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.timeout_ms, 2000);
        assert_eq!(reloaded.auth_scheme, "Bearer");

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(rx.try_recv().is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_unchanged_rewrite_publishes_nothing() {
        let path = temp_config("watch-same", "timeout_ms = 1000\n");
        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _handle = watcher.settle(Duration::from_millis(100)).run().unwrap();

        std::fs::write(&path, "timeout_ms = 1000\n").unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(rx.try_recv().is_err());

        std::fs::write(&path, "timeout_ms = 3000\n").unwrap();
        let reloaded = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.timeout_ms, 3000);

        let _ = std::fs::remove_file(&path);
    }
}
