//! Filesystem and timing for deployment logs.

pub mod config;
pub mod producer;
pub mod storage;
pub mod tailer;
