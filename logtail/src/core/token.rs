//! Deployment tokens and the file names derived from them.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Extension of every deployment log file.
pub const LOG_EXTENSION: &str = "log";

/// Opaque identifier of one deployment, rendered as a hyphenated UUID.
///
/// Only well-formed tokens are ever turned into paths, so a request path can never
/// escape the storage directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeploymentToken(Uuid);

impl DeploymentToken {
    /// Allocate a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token from a request path segment or file stem.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }

    /// File name of the log backing this deployment (`<token>.log`).
    pub fn file_name(&self) -> String {
        format!("{}.{LOG_EXTENSION}", self.0.hyphenated())
    }
}

impl fmt::Display for DeploymentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DeploymentToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
