//! Synthetic deployment logs with concurrent tailing.
//!
//! A deployment is a single append-only log file addressed by a generated token.
//! A background producer appends synthetic records to it at a fixed cadence while
//! any number of tailers stream the same file to remote clients. The crate keeps
//! the same split between pure logic and side effects:
//!
//! - **[`core`]**: Pure, deterministic logic (tokens, record format, the tail
//!   state machine). No I/O.
//! - **[`io`]**: Filesystem and timing (storage layout, producer, tailer, config).
//!
//! [`deploy`] ties the two together through the [`supervisor`], which owns every
//! spawned producer task.

pub mod core;
pub mod deploy;
pub mod error;
pub mod generator;
pub mod io;
pub mod logging;
pub mod supervisor;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::token::DeploymentToken;
pub use crate::error::{Error, Result};
