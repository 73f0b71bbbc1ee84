// src/scan.rs
use anyhow::{Context, Result};
use std::{path::Path, time::Duration};
use tokio::{fs, time::Instant};
use tracing::{debug, error, info, instrument};

use crate::{
    error::ReadError,
    reader::{read_last_record_with, ReaderOptions},
    record::{Record, ResultSet},
};

/// Files considered by the scanner end with this literal, case-sensitive suffix.
pub const CSV_SUFFIX: &str = ".csv";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub reader: ReaderOptions,
    /// Upper bound for reading a single file. `None` waits indefinitely.
    pub file_timeout: Option<Duration>,
}

/// A file whose last record could not be read.
#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub error: ReadError,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub records: ResultSet,
    pub failures: Vec<FileFailure>,
}

/// Read the latest record from every `.csv` file directly inside `dir`.
///
/// Per-file failures are logged and omitted from the result; only a failure
/// to list `dir` itself is returned as an error.
pub async fn scan_directory(dir: impl AsRef<Path>) -> Result<ResultSet> {
    let report = scan_directory_report(dir, &ScanOptions::default()).await?;
    Ok(report.records)
}

/// Like [`scan_directory`], also returning the per-file failures.
#[instrument(level = "info", skip(dir, opts), fields(dir = %dir.as_ref().display()))]
pub async fn scan_directory_report(
    dir: impl AsRef<Path>,
    opts: &ScanOptions,
) -> Result<ScanReport> {
    let dir = dir.as_ref();
    let start = Instant::now();
    let names = list_csv_files(dir).await?;
    debug!(files = names.len(), "matched csv files");

    let mut report = ScanReport::default();
    for name in names {
        let path = dir.join(&name);
        match read_one(&path, opts).await {
            Ok(record) => {
                debug!(file = %name, columns = record.len(), "read latest record");
                report.records.insert(name, record);
            }
            Err(err) => {
                error!("Error reading {}: {}", name, err);
                report.failures.push(FileFailure {
                    file_name: name,
                    error: err,
                });
            }
        }
    }

    info!(
        records = report.records.len(),
        failed = report.failures.len(),
        elapsed = ?start.elapsed(),
        "scan complete"
    );
    Ok(report)
}

/// Names of entries in `dir` ending in [`CSV_SUFFIX`], in enumeration order.
async fn list_csv_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            debug!(entry = ?entry.file_name(), "skipping non-UTF-8 entry name");
            continue;
        };
        if name.ends_with(CSV_SUFFIX) {
            names.push(name);
        }
    }
    Ok(names)
}

async fn read_one(path: &Path, opts: &ScanOptions) -> Result<Record, ReadError> {
    let read = read_last_record_with(path, &opts.reader);
    match opts.file_timeout {
        Some(timeout) => tokio::time::timeout(timeout, read)
            .await
            .map_err(|_| ReadError::Timeout {
                path: path.to_path_buf(),
                timeout,
            })?,
        None => read.await,
    }
}
