use super::{AppConfig, MAX_CONNECT_TIMEOUT_MS, MIN_CONNECT_TIMEOUT_MS};
use crate::options::TermOptions;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_CONNECT_TIMEOUT_MS..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            bail!(
                "--connect-timeout-ms must be between {MIN_CONNECT_TIMEOUT_MS} and {MAX_CONNECT_TIMEOUT_MS}, got {}",
                self.connect_timeout_ms
            );
        }
        if self.attempt_wait_ms == 0 || self.attempt_wait_ms > self.connect_timeout_ms {
            bail!(
                "--attempt-wait-ms must be between 1 and --connect-timeout-ms ({}), got {}",
                self.connect_timeout_ms,
                self.attempt_wait_ms
            );
        }

        if let Some(dir) = &self.driver_dir {
            self.driver_dir = Some(canonical_dir(dir, "--driver-dir")?);
        }
        if let Some(dir) = &self.socket_dir {
            self.socket_dir = Some(canonical_dir(dir, "--socket-dir")?);
        }

        // Reject bad option strings before any window is opened.
        TermOptions::default()
            .apply(&self.term_options)
            .with_context(|| format!("invalid --term-options '{}'", self.term_options))?;

        Ok(())
    }
}

/// Canonicalize a directory flag and make sure it is a directory.
pub(super) fn canonical_dir(path: &Path, flag: &str) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {flag} '{}'", path.display()))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
    if !metadata.is_dir() {
        bail!("{flag} '{}' is not a directory", canonical.display());
    }
    Ok(canonical)
}
