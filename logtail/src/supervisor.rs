//! Registry of producer tasks keyed by deployment token.
//!
//! Every producer runs on its own task. The supervisor publishes its status on a
//! watch channel so tailers and the listing endpoint can tell a live log from a
//! finished one, and any number of callers can wait for it to stop. The join
//! handle is released once the producer is done; only the status stays.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::status::ProducerStatus;
use crate::core::token::DeploymentToken;
use crate::error::Result;

#[derive(Debug)]
struct Entry {
    status: watch::Sender<ProducerStatus>,
    /// `None` once the producer has stopped.
    handle: Option<JoinHandle<()>>,
}

impl Entry {
    fn current(&self) -> ProducerStatus {
        *self.status.borrow()
    }
}

/// Shared handle to the producer registry. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    entries: Arc<Mutex<HashMap<DeploymentToken, Entry>>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `producer` as the single producer for `token`.
    ///
    /// The token is registered as running before the task starts, so a tailer
    /// that looks it up right after this call never sees it as unknown. A
    /// producer error or panic is logged and recorded as
    /// [`ProducerStatus::Failed`]; it never propagates.
    pub fn spawn<F>(&self, token: DeploymentToken, producer: F)
    where
        F: Future<Output = Result<u32>> + Send + 'static,
    {
        let mut entries = self.lock();
        if entries
            .get(&token)
            .is_some_and(|entry| entry.current() == ProducerStatus::Running)
        {
            warn!(token = %token, "producer already running, ignoring duplicate spawn");
            return;
        }

        let supervisor = self.clone();
        let handle = tokio::spawn(async move {
            let status = match tokio::spawn(producer).await {
                Ok(Ok(records)) => {
                    info!(token = %token, records, "deployment log complete");
                    ProducerStatus::Finished
                }
                Ok(Err(e)) => {
                    error!(token = %token, error = %e, "producer failed");
                    ProducerStatus::Failed
                }
                Err(e) => {
                    error!(token = %token, error = %e, "producer task aborted");
                    ProducerStatus::Failed
                }
            };
            supervisor.finish(token, status);
        });

        let (status, _) = watch::channel(ProducerStatus::Running);
        entries.insert(
            token,
            Entry {
                status,
                handle: Some(handle),
            },
        );
    }

    /// Current status of the producer for `token`, if this process started one.
    pub fn status(&self, token: &DeploymentToken) -> Option<ProducerStatus> {
        self.lock().get(token).map(Entry::current)
    }

    /// Snapshot of every known producer.
    pub fn statuses(&self) -> HashMap<DeploymentToken, ProducerStatus> {
        self.lock()
            .iter()
            .map(|(token, entry)| (*token, entry.current()))
            .collect()
    }

    /// Producers whose task is still live.
    pub fn running_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| entry.handle.is_some())
            .count()
    }

    /// Wait for the producer of `token` to stop and return its final status.
    ///
    /// Any number of callers may wait at once. Returns `None` for unknown tokens.
    pub async fn wait(&self, token: &DeploymentToken) -> Option<ProducerStatus> {
        let mut rx = self.lock().get(token)?.status.subscribe();
        let finished = rx
            .wait_for(|status| status.is_terminal())
            .await
            .ok()
            .map(|status| *status);
        finished.or_else(|| self.status(token))
    }

    fn finish(&self, token: DeploymentToken, status: ProducerStatus) {
        if let Some(entry) = self.lock().get_mut(&token) {
            entry.handle = None;
            entry.status.send_replace(status);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeploymentToken, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn unknown_token_has_no_status() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        assert_eq!(supervisor.status(&token), None);
        assert_eq!(supervisor.wait(&token).await, None);
    }

    #[tokio::test]
    async fn successful_producer_finishes() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        supervisor.spawn(token, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(3)
        });

        assert_eq!(supervisor.status(&token), Some(ProducerStatus::Running));
        assert_eq!(supervisor.running_count(), 1);
        assert_eq!(supervisor.wait(&token).await, Some(ProducerStatus::Finished));
        assert_eq!(supervisor.status(&token), Some(ProducerStatus::Finished));
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn failing_producer_is_contained() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        supervisor.spawn(token, async {
            Err(Error::Storage {
                path: PathBuf::from("x.log"),
                source: std::io::Error::other("disk full"),
            })
        });

        assert_eq!(supervisor.wait(&token).await, Some(ProducerStatus::Failed));
    }

    async fn exploding_producer() -> Result<u32> {
        panic!("generator exploded")
    }

    #[tokio::test]
    async fn panicking_producer_is_contained() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        supervisor.spawn(token, exploding_producer());

        assert_eq!(supervisor.wait(&token).await, Some(ProducerStatus::Failed));
        assert_eq!(supervisor.statuses().get(&token), Some(&ProducerStatus::Failed));
    }

    #[tokio::test]
    async fn concurrent_waiters_all_see_final_status() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        supervisor.spawn(token, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(1)
        });

        let (a, b) = tokio::join!(supervisor.wait(&token), supervisor.wait(&token));
        assert_eq!(a, Some(ProducerStatus::Finished));
        assert_eq!(b, Some(ProducerStatus::Finished));
    }

    #[tokio::test]
    async fn finished_producer_releases_its_task_handle() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        supervisor.spawn(token, async { Ok(2) });
        assert!(supervisor.lock().get(&token).expect("entry").handle.is_some());

        supervisor.wait(&token).await;
        let entries = supervisor.lock();
        let entry = entries.get(&token).expect("entry kept");
        assert!(entry.handle.is_none());
        assert_eq!(entry.current(), ProducerStatus::Finished);
    }

    #[tokio::test]
    async fn second_wait_returns_recorded_status() {
        let supervisor = Supervisor::new();
        let token = DeploymentToken::generate();
        supervisor.spawn(token, async { Ok(0) });

        assert_eq!(supervisor.wait(&token).await, Some(ProducerStatus::Finished));
        assert_eq!(supervisor.wait(&token).await, Some(ProducerStatus::Finished));
    }
}
