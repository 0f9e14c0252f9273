//! Background polling of the backend log endpoint.
//!
//! The poller fetches `/logs` once on start and then on every tick, and
//! publishes the latest text on a watch channel. It runs until cancelled or
//! until its handle is dropped.

use std::sync::Arc;
use std::time::Duration;

use ragchat_client::Backend;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawns log polling tasks.
pub struct LogPoller;

impl LogPoller {
    /// Start polling `backend` every `interval`. Must be called from within
    /// a tokio runtime.
    pub fn spawn<B>(backend: Arc<B>, interval: Duration) -> LogPollerHandle
    where
        B: Backend + ?Sized + 'static,
    {
        let (tx, rx) = watch::channel(String::new());
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let text = match backend.logs().await {
                            Ok(logs) => logs,
                            Err(e) => {
                                tracing::warn!(error = %e, "Log fetch failed");
                                format!("Error fetching logs: {}", e)
                            }
                        };
                        if tx.send(text).is_err() {
                            return;
                        }
                    }
                    _ = signal.notified() => {
                        tracing::debug!("Log poller stopped");
                        return;
                    }
                }
            }
        });

        tracing::info!(interval_secs = interval.as_secs_f64(), "Log poller started");
        LogPollerHandle {
            latest: rx,
            shutdown,
            task: Some(task),
        }
    }
}

/// Owner of a running poller. Dropping it stops the task.
pub struct LogPollerHandle {
    latest: watch::Receiver<String>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl LogPollerHandle {
    /// Most recent log text; empty until the first fetch completes.
    pub fn latest(&self) -> String {
        self.latest.borrow().clone()
    }

    /// A receiver that is notified on every fetch.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.latest.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the poller and wait for its task to exit.
    pub async fn cancel(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "Log poller task ended abnormally");
            }
        }
    }
}

impl Drop for LogPollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragchat_client::{ApiError, QueryResponse, TableSchemas, UploadFile, UploadResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingBackend {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Backend for CountingBackend {
        async fn query(&self, _query: &str) -> Result<QueryResponse, ApiError> {
            unimplemented!()
        }
        async fn upload(&self, _file: UploadFile) -> Result<UploadResponse, ApiError> {
            unimplemented!()
        }
        async fn tables(&self) -> Result<TableSchemas, ApiError> {
            unimplemented!()
        }
        async fn logs(&self) -> Result<String, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                Err(ApiError::Transport("connection refused".to_string()))
            } else {
                Ok(format!("line {}", n))
            }
        }
    }

    async fn wait_for_change(rx: &mut watch::Receiver<String>) {
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("poller should publish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_fetch_is_immediate() {
        let backend = CountingBackend::new(false);
        let handle = LogPoller::spawn(Arc::clone(&backend), Duration::from_secs(3600));
        let mut rx = handle.subscribe();
        wait_for_change(&mut rx).await;
        assert_eq!(handle.latest(), "line 1");
        assert!(handle.is_running());
        handle.cancel().await;
    }

    #[tokio::test]
    async fn test_failure_text_is_published() {
        let backend = CountingBackend::new(true);
        let handle = LogPoller::spawn(Arc::clone(&backend), Duration::from_secs(3600));
        let mut rx = handle.subscribe();
        wait_for_change(&mut rx).await;
        assert_eq!(handle.latest(), "Error fetching logs: connection refused");
        handle.cancel().await;
    }

    #[tokio::test]
    async fn test_cancel_stops_requests() {
        let backend = CountingBackend::new(false);
        let handle = LogPoller::spawn(Arc::clone(&backend), Duration::from_millis(10));
        let mut rx = handle.subscribe();
        wait_for_change(&mut rx).await;
        wait_for_change(&mut rx).await;

        handle.cancel().await;
        let after_cancel = backend.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_drop_stops_requests() {
        let backend = CountingBackend::new(false);
        let handle = LogPoller::spawn(Arc::clone(&backend), Duration::from_millis(10));
        let mut rx = handle.subscribe();
        wait_for_change(&mut rx).await;

        drop(handle);
        // Let the abort land before sampling.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = backend.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), after_drop);
    }
}
