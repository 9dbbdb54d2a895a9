//! Soak harness entry point.
//!
//! Usage: `tonecam-harness [config.json]`. Prints the run report as JSON.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use tonecam_harness::HarnessConfig;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = HarnessConfig::load(config_path.as_deref())?;
    info!(
        output_dir = %config.output_dir.display(),
        preview = %config.preview(),
        "Starting soak harness"
    );

    let report = tonecam_harness::run(&config)?;
    if report.encoder_dropped_frames > 0 {
        info!(
            dropped = report.encoder_dropped_frames,
            "Encoder fell behind; preview kept running"
        );
    }

    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    println!("{}", json);
    Ok(())
}
