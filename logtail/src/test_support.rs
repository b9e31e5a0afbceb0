//! Test-only helpers for deployment logs.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use crate::core::record::Persona;
use crate::deploy::Deployer;
use crate::generator::RecordGenerator;
use crate::io::producer::ProducerSettings;
use crate::io::storage::LogStore;
use crate::io::tailer::TailSettings;

/// Storage directory that is removed when dropped.
pub struct TempStore {
    dir: TempDir,
}

impl TempStore {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> LogStore {
        LogStore::new(self.dir.path())
    }

    /// Deployer with `record_count` records at `interval`, tailed at the same cadence.
    pub fn deployer(&self, record_count: u32, interval: Duration) -> Deployer {
        Deployer::new(
            self.store(),
            ProducerSettings {
                record_count,
                interval,
            },
            TailSettings {
                poll_interval: interval,
                idle_poll_limit: 20,
            },
        )
    }
}

/// Deterministic personas: `Person 1`, `Person 2`, ...
#[derive(Debug, Clone, Default)]
pub struct FixedGenerator {
    next: u32,
}

impl FixedGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordGenerator for FixedGenerator {
    fn persona(&mut self) -> Persona {
        self.next += 1;
        Persona {
            name: format!("Person {}", self.next),
            gender: if self.next % 2 == 0 { "Male" } else { "Female" }.to_string(),
            phone: format!("555-000-{:04}", self.next),
        }
    }
}
