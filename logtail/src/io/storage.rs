//! Flat-directory layout: one `<token>.log` file per deployment.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tracing::{debug, info};

use crate::core::token::{DeploymentToken, LOG_EXTENSION};
use crate::error::{Error, Result};

/// Directory holding every deployment log.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::storage(&self.dir, e))?;
        debug!(dir = %self.dir.display(), "storage directory ready");
        Ok(())
    }

    /// Canonical log path for a token.
    pub fn path_for(&self, token: &DeploymentToken) -> PathBuf {
        self.dir.join(token.file_name())
    }

    /// Create the empty log for a new deployment.
    ///
    /// Fails instead of truncating if the file already exists.
    pub async fn create(&self, token: &DeploymentToken) -> Result<File> {
        let path = self.path_for(token);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| Error::storage(&path, e))?;
        info!(token = %token, path = %path.display(), "created deployment log");
        Ok(file)
    }

    /// Open an existing log for reading.
    ///
    /// Malformed tokens and missing files are both reported as [`Error::NotFound`];
    /// an existing empty file is not.
    pub async fn open(&self, raw_token: &str) -> Result<(DeploymentToken, File)> {
        let not_found = || Error::NotFound(raw_token.to_string());
        let token = DeploymentToken::parse(raw_token).ok_or_else(not_found)?;
        let path = self.path_for(&token);
        match File::open(&path).await {
            Ok(file) => Ok((token, file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(Error::storage(&path, e)),
        }
    }

    /// Tokens of every deployment log in the directory, sorted.
    ///
    /// Subdirectories and files that are not `<token>.log` are skipped.
    pub fn list(&self) -> Result<Vec<DeploymentToken>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| Error::storage(&self.dir, e))?;

        let mut tokens = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Only canonical names; other spellings would not resolve through `path_for`.
            if let Some(token) = DeploymentToken::parse(stem)
                && token.to_string() == stem
            {
                tokens.push(token);
            }
        }

        tokens.sort();
        Ok(tokens)
    }
}
