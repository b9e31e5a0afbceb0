//! Producer lifecycle as seen by the supervisor.

use std::fmt;

/// Lifecycle of one producer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerStatus {
    Running,
    /// Every record and the sentinel were written.
    Finished,
    /// Production stopped early; the log has no sentinel.
    Failed,
}

impl ProducerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    /// Whether the producer will never append again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ProducerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
