//! asa-to-ifdb - Main entry point

use asa_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use asa_ingest::influx::InfluxClient;
use asa_ingest::writer::{DryRunSink, PointSink};
use asa_ingest::{config, AppConfig, Cli, InfluxConfig, Ingestor};
use clap::Parser;
use std::process;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Console)
        .log_file_prefix("asa-to-ifdb")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::with_env(log_config.clone()).unwrap_or(log_config);

    // The tool works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = run(&cli).await {
        error!(error = %e, "Run failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path()?;

    if cli.create_config {
        config::create_template(&config_path)?;
        println!(
            "Created configuration template at {}, edit it before the first run",
            config_path.display()
        );
        return Ok(());
    }

    let run = cli.run_options();
    run.validate()?;

    let influx = InfluxConfig::load(&config_path)?;
    let app = AppConfig::new(influx, run)?;

    let client = InfluxClient::new(&app.influx)?;
    let stdout_sink = DryRunSink::new(std::io::stdout());
    let sink: &dyn PointSink = if app.run.dry_run {
        info!("Test mode, printing points instead of writing them");
        &stdout_sink
    } else {
        &client
    };

    Ingestor::new(&app, &client, sink).run().await?;

    Ok(())
}
