mod session;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

use fleet_source_core::SnapshotSource;
use fleet_source_file::{FileConfig, FileSource};
use fleet_source_http::{HttpConfig, HttpSource};
use iox::GeoJsonLayer;
use reconcile::{CycleOutcome, PollConfig, Poller, Reconciler, ReconcilerConfig, StatusFormatter};
use session::AppSession;

/// Poll a fleet snapshot and keep vehicle and task markers in sync with it.
#[derive(Debug, Parser)]
#[command(name = "fleet-viewer", version)]
struct Cli {
    /// Snapshot URL, polled with a cache-busting `t` query parameter.
    #[arg(long, value_name = "URL", conflicts_with = "file")]
    url: Option<String>,
    /// Snapshot file on disk [default: map_viewer/state.json].
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Delay after each cycle before the next fetch.
    #[arg(long = "interval-ms", value_name = "MS", default_value_t = 300)]
    interval_ms: u64,
    /// Request timeout for `--url`. No timeout by default.
    #[arg(long = "timeout-ms", value_name = "MS", requires = "url")]
    timeout_ms: Option<u64>,
    /// Remove vehicle markers missing from K consecutive snapshots.
    #[arg(long = "evict-after", value_name = "K", value_parser = clap::value_parser!(u32).range(1..))]
    evict_after: Option<u32>,
    /// Write the marker layer as GeoJSON after every cycle.
    #[arg(long, value_name = "PATH")]
    geojson: Option<PathBuf>,
    /// Run a single cycle, print the status line and exit.
    #[arg(long)]
    once: bool,
    /// Show update times in UTC instead of local time.
    #[arg(long)]
    utc: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    // the local offset can only be read while the process is single-threaded
    let formatter = if cli.utc {
        StatusFormatter::utc()
    } else {
        match UtcOffset::current_local_offset() {
            Ok(offset) => StatusFormatter::with_offset(offset),
            Err(err) => {
                tracing::warn!(error = %err, "local offset unavailable, showing UTC");
                StatusFormatter::utc()
            }
        }
    };

    let source = build_source(&cli)?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;
    rt.block_on(watch(cli, source, formatter))
}

fn build_source(cli: &Cli) -> Result<Box<dyn SnapshotSource>> {
    if let Some(url) = &cli.url {
        let cfg = HttpConfig { url: url.clone(), timeout: cli.timeout_ms.map(Duration::from_millis) };
        return Ok(Box::new(HttpSource::new(cfg)?));
    }
    let cfg = match &cli.file {
        Some(path) => FileConfig { path: path.clone() },
        None => FileConfig::default(),
    };
    Ok(Box::new(FileSource::new(cfg)))
}

async fn watch(cli: Cli, source: Box<dyn SnapshotSource>, formatter: StatusFormatter) -> Result<()> {
    let layer = match &cli.geojson {
        Some(path) => GeoJsonLayer::with_output(path),
        None => GeoJsonLayer::new(),
    };
    let reconciler = Reconciler::new(layer, ReconcilerConfig { evict_after: cli.evict_after });
    let session = AppSession::new(!cli.once);
    let cfg = PollConfig { interval: Duration::from_millis(cli.interval_ms) };

    tracing::info!(source = %source.describe(), interval_ms = cli.interval_ms, "fleet viewer started");
    let mut poller = Poller::new(source, reconciler, session.clone(), formatter, cfg);

    if cli.once {
        let outcome = poller.tick().await;
        println!("{}", session.status());
        let mut ids: Vec<&str> = poller.reconciler().registry().vehicle_ids().collect();
        ids.sort_unstable();
        for id in ids {
            println!("  {id}");
        }
        if outcome == CycleOutcome::Waiting {
            bail!("snapshot unavailable");
        }
        return Ok(());
    }

    tokio::select! {
        _ = poller.run() => {}
        res = tokio::signal::ctrl_c() => res.context("listen for ctrl-c")?,
    }

    let summary = session.summary();
    println!();
    tracing::info!(
        cycles = summary.cycles,
        waiting_cycles = summary.waiting_cycles,
        last_status = %summary.status,
        "fleet viewer stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["fleet-viewer"]).unwrap();
        assert_eq!(cli.interval_ms, 300);
        assert!(cli.url.is_none() && cli.file.is_none());
        assert!(cli.evict_after.is_none());
    }

    #[test]
    fn url_and_file_conflict() {
        assert!(Cli::try_parse_from(["fleet-viewer", "--url", "http://h/state.json", "--file", "s.json"]).is_err());
    }

    #[test]
    fn timeout_needs_url() {
        assert!(Cli::try_parse_from(["fleet-viewer", "--timeout-ms", "500"]).is_err());
        let cli = Cli::try_parse_from(["fleet-viewer", "--url", "http://h/state.json", "--timeout-ms", "500"]).unwrap();
        assert_eq!(cli.timeout_ms, Some(500));
    }

    #[test]
    fn evict_after_must_be_positive() {
        assert!(Cli::try_parse_from(["fleet-viewer", "--evict-after", "0"]).is_err());
        let cli = Cli::try_parse_from(["fleet-viewer", "--evict-after", "5"]).unwrap();
        assert_eq!(cli.evict_after, Some(5));
    }

    #[test]
    fn file_source_by_default() {
        let cli = Cli::try_parse_from(["fleet-viewer"]).unwrap();
        let source = build_source(&cli).unwrap();
        assert_eq!(source.describe(), "map_viewer/state.json");
    }

    #[tokio::test]
    async fn once_against_missing_file_fails() {
        let missing = std::env::temp_dir().join("fleet-viewer-missing-state.json");
        let cli = Cli::try_parse_from(["fleet-viewer", "--once", "--file", missing.to_str().unwrap()]).unwrap();
        let source = build_source(&cli).unwrap();
        assert!(watch(cli, source, StatusFormatter::utc()).await.is_err());
    }
}
