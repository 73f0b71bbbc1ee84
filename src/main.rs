use anyhow::{Context, Result};
use csvtail::{config::ScanConfig, scan_directory_report};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging (stderr; stdout is reserved for the JSON result) ───
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) configuration ───────────────────────────────────────────
    let cfg = ScanConfig::from_env(std::env::args().nth(1))?;
    info!(
        dir = %cfg.dir.display(),
        header_mode = ?cfg.options.reader.header_mode,
        file_timeout = ?cfg.options.file_timeout,
        "startup"
    );

    // ─── 3) scan ────────────────────────────────────────────────────
    // A timed-out read can leave a blocking thread stuck in open(2);
    // shut down without waiting on it.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let report = rt.block_on(scan_directory_report(&cfg.dir, &cfg.options));
    rt.shutdown_background();
    let report = report?;

    // ─── 4) print ───────────────────────────────────────────────────
    let json = serde_json::to_string_pretty(&report.records)
        .context("serializing scan result")?;
    println!("{}", json);

    Ok(())
}
