//! Vault watcher.
//!
//! Filesystem events on the vault feed a trailing-edge debounce; a batch
//! scan fires once after the event stream has been quiet for the configured
//! interval, and every new event re-arms the timer. Triggered scans go
//! through the pipeline's in-flight guard.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::scan::{ScanOutcome, ScanPipeline};

/// Trailing-edge debounce over an injected clock. `signal` re-arms the
/// quiet-period deadline; `fire` returns true exactly once per armed window,
/// after the deadline has passed.
#[derive(Debug)]
pub struct Debounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn signal(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn armed(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Watches a vault and triggers debounced batch scans.
pub struct VaultWatcher {
    pipeline: Arc<ScanPipeline>,
    quiet: Duration,
    extensions: Vec<String>,
}

impl VaultWatcher {
    pub fn new(pipeline: Arc<ScanPipeline>, quiet: Duration, extensions: Vec<String>) -> Self {
        Self {
            pipeline,
            quiet,
            extensions,
        }
    }

    /// Spawn the watcher task. Stop it through the returned handle.
    pub fn spawn(self) -> WatchHandle {
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            if let Err(e) = self.run(&mut stop_rx).await {
                tracing::error!("Watcher error: {}", e);
            }
        });

        WatchHandle { stop_tx, task }
    }

    async fn run(&self, stop_rx: &mut mpsc::Receiver<()>) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
        debouncer
            .watcher()
            .watch(self.pipeline.vault().root(), RecursiveMode::Recursive)?;

        let mut debounce = Debounce::new(self.quiet);

        info!(
            "Watching {} for note and audio changes",
            self.pipeline.vault().root().display()
        );

        loop {
            if stop_rx.try_recv().is_ok() {
                info!("Watcher stopping...");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(500)) {
                Ok(Ok(events)) => {
                    if events.iter().any(|e| self.is_relevant(&e.path)) {
                        debounce.signal(Instant::now());
                    }
                }
                Ok(Err(e)) => {
                    warn!("Watcher error: {:?}", e);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    // Expected - fall through to the debounce check
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    warn!("Watcher channel disconnected");
                    break;
                }
            }

            if debounce.fire(Instant::now()) {
                match self.pipeline.try_scan_all().await {
                    Ok(ScanOutcome::Completed(summary)) => info!("{}", summary.notice()),
                    Ok(ScanOutcome::AlreadyRunning) => {}
                    Err(e) => warn!(error = %e, "Triggered scan failed"),
                }
            }
        }

        Ok(())
    }

    /// Notes and recognized audio files re-arm the debounce; everything
    /// else (including our own config directory) is noise.
    fn is_relevant(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        ext.eq_ignore_ascii_case("md")
            || self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Handle to control the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the watcher
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_debounce_never_fires() {
        let mut debounce = Debounce::new(Duration::from_secs(5));
        assert!(!debounce.armed());
        assert!(!debounce.fire(Instant::now()));
    }

    #[test]
    fn test_many_signals_one_fire() {
        let mut debounce = Debounce::new(Duration::from_secs(5));
        let start = Instant::now();

        for i in 0..10 {
            debounce.signal(start + Duration::from_millis(i * 100));
        }

        // Still inside the quiet window of the last signal
        assert!(!debounce.fire(start + Duration::from_secs(3)));

        // Quiet period elapsed: exactly one fire
        let after = start + Duration::from_secs(7);
        assert!(debounce.fire(after));
        assert!(!debounce.fire(after));
        assert!(!debounce.armed());
    }

    #[test]
    fn test_signal_rearms_the_deadline() {
        let mut debounce = Debounce::new(Duration::from_secs(5));
        let start = Instant::now();

        debounce.signal(start);
        // A late signal pushes the deadline out
        debounce.signal(start + Duration::from_secs(4));

        assert!(!debounce.fire(start + Duration::from_secs(6)));
        assert!(debounce.fire(start + Duration::from_secs(10)));
    }
}
