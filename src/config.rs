// src/config.rs
use anyhow::{anyhow, Context, Result};
use std::{env, path::PathBuf, time::Duration};

use crate::{
    reader::{HeaderMode, ReaderOptions},
    scan::ScanOptions,
};

pub const DIR_VAR: &str = "CSVTAIL_DIR";
pub const HEADER_MODE_VAR: &str = "CSVTAIL_HEADER_MODE";
pub const FILE_TIMEOUT_VAR: &str = "CSVTAIL_FILE_TIMEOUT_SECS";
pub const DEFAULT_DIR: &str = "./csv-folder";

/// Settings for one run of the `csvtail` binary.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub dir: PathBuf,
    pub options: ScanOptions,
}

impl ScanConfig {
    /// Build from the process environment; `dir_arg` (first CLI argument) wins over `CSVTAIL_DIR`.
    pub fn from_env(dir_arg: Option<String>) -> Result<Self> {
        Self::from_lookup(dir_arg, |key| env::var(key).ok())
    }

    fn from_lookup<F>(dir_arg: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dir = dir_arg
            .or_else(|| lookup(DIR_VAR))
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DIR.to_string());

        let header_mode = match lookup(HEADER_MODE_VAR) {
            Some(raw) => raw
                .parse::<HeaderMode>()
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("invalid {}", HEADER_MODE_VAR))?,
            None => HeaderMode::default(),
        };

        let file_timeout = match lookup(FILE_TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid {}: {:?}", FILE_TIMEOUT_VAR, raw))?;
                if secs == 0 {
                    return Err(anyhow!("{} must be positive", FILE_TIMEOUT_VAR));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            dir: PathBuf::from(dir),
            options: ScanOptions {
                reader: ReaderOptions { header_mode },
                file_timeout,
            },
        })
    }
}
