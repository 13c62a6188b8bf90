//! asa-to-ifdb library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Uploads telegram logs of the AskSin Analyzer XS into InfluxDB 2.x.
//!
//! # Overview
//!
//! - **Sequencing**: Pick `TelegramsXS_*.csv` files from a directory and/or
//!   an explicit list, ordered by modification time
//! - **Parsing**: Stream the `;`-separated rows of each file
//! - **Incremental mode**: Only upload records newer than the last one the
//!   bucket already holds (`--latest`)
//! - **Writing**: One line protocol write per file, or print it (`--test`)

pub mod config;
pub mod dedup;
pub mod error;
pub mod influx;
pub mod parser;
pub mod pipeline;
pub mod retry;
pub mod sequencer;
pub mod watermark;
pub mod writer;

// Re-export commonly used types
pub use config::{AppConfig, InfluxConfig, RunOptions};
pub use error::{IngestError, Result};
pub use pipeline::{IngestReport, Ingestor};

use clap::Parser;
use std::path::PathBuf;

/// Upload AskSin Analyzer XS telegram logs to InfluxDB
#[derive(Parser, Debug)]
#[command(name = "asa-to-ifdb")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Directory containing TelegramsXS_*.csv files
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Telegram file to process (repeatable)
    #[arg(short, long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Print line protocol instead of writing to InfluxDB
    #[arg(short = 't', long = "test")]
    pub dry_run: bool,

    /// Only the newest file, only records newer than the last one in InfluxDB
    #[arg(short, long)]
    pub latest: bool,

    /// Configuration file (defaults to ~/.asa-to-ifdb.toml)
    #[arg(short = 'c', long, value_name = "PATH", env = "ASA_IFDB_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Write a configuration template and exit
    #[arg(long)]
    pub create_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Run options selected on the command line
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dir: self.dir.clone(),
            files: self.files.clone(),
            dry_run: self.dry_run,
            latest: self.latest,
        }
    }

    /// Config file to use, `--config-file` or the default location
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_file {
            Some(path) => Ok(path.clone()),
            None => config::default_config_path(),
        }
    }
}
