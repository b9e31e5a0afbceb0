//! Starting deployments and opening their log streams.
//!
//! A deployment is started by creating its empty log synchronously (so storage
//! failures reach the caller) and then handing the producer to the
//! [`Supervisor`]. The caller gets the token back without waiting for any
//! record to be written.

use tracing::{debug, instrument};

use crate::core::status::ProducerStatus;
use crate::core::token::DeploymentToken;
use crate::error::Result;
use crate::generator::{RandomGenerator, RecordGenerator};
use crate::io::producer::{ProducerSettings, produce_records};
use crate::io::storage::LogStore;
use crate::io::tailer::{TailSettings, Tailer};
use crate::supervisor::Supervisor;

/// One row of the deployment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub token: DeploymentToken,
    /// `None` when no producer for this log ran in this process.
    pub status: Option<ProducerStatus>,
}

/// Entry point for starting, tailing and listing deployments.
#[derive(Debug, Clone)]
pub struct Deployer {
    store: LogStore,
    supervisor: Supervisor,
    producer: ProducerSettings,
    tail: TailSettings,
}

impl Deployer {
    pub fn new(store: LogStore, producer: ProducerSettings, tail: TailSettings) -> Self {
        Self {
            store,
            supervisor: Supervisor::new(),
            producer,
            tail,
        }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Start a deployment with random synthetic records.
    pub async fn start(&self) -> Result<DeploymentToken> {
        self.start_with(RandomGenerator::new()).await
    }

    /// Start a deployment whose records come from `generator`.
    #[instrument(skip_all)]
    pub async fn start_with<G: RecordGenerator>(&self, generator: G) -> Result<DeploymentToken> {
        let token = DeploymentToken::generate();
        let file = self.store.create(&token).await?;
        let path = self.store.path_for(&token);

        self.supervisor.spawn(
            token,
            produce_records(token, file, path, self.producer, generator),
        );
        debug!(token = %token, "producer scheduled");
        Ok(token)
    }

    /// Open a tail stream on the deployment named by `raw_token`.
    ///
    /// Fails with [`crate::Error::NotFound`] before anything is streamed when the
    /// token is malformed or has no log.
    pub async fn tail(&self, raw_token: &str) -> Result<Tailer> {
        let (token, file) = self.store.open(raw_token).await?;
        debug!(token = %token, "opening tail");
        Ok(Tailer::new(
            token,
            file,
            self.store.path_for(&token),
            self.tail,
            self.supervisor.clone(),
        ))
    }

    /// Every deployment log on disk, with its producer status when known.
    pub fn list(&self) -> Result<Vec<DeploymentSummary>> {
        let statuses = self.supervisor.statuses();
        let summaries = self
            .store
            .list()?
            .into_iter()
            .map(|token| DeploymentSummary {
                token,
                status: statuses.get(&token).copied(),
            })
            .collect();
        Ok(summaries)
    }
}
