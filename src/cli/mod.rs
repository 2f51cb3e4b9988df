//! Command-line entry point
//!
//! Resolves configuration, loads test files into a suite, runs it and maps
//! the outcome to a process exit code.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::common::Config;
use crate::runner::{self, ConsoleReporter};
use crate::suite::{loader, SuiteBuilder};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "aie2e", about = "Run natural-language browser tests on a remote executor")]
#[command(version, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Test file, or directory searched recursively for test files
    #[arg(value_name = "TEST_FILES_PATH")]
    pub test_files_path: PathBuf,

    /// Log every protocol message to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the test suite described by `args`, returning the exit code
pub async fn run(args: Args) -> i32 {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }

    let config = match Config::resolve(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return EXIT_FAILURE;
        }
    };
    if let Some(source) = &config.source {
        tracing::debug!(config = %source.display(), transport = config.transport.kind(), "Resolved configuration");
    }

    let mut builder = SuiteBuilder::new(&config);
    let loaded = loader::load_path(&args.test_files_path, &mut builder, |file| {
        println!("{}", file.display());
    });
    if let Err(e) = loaded {
        eprintln!("Error loading test files: {e}");
        return EXIT_FAILURE;
    }

    let suite = builder.build();
    match runner::run_suite(suite, Arc::new(ConsoleReporter::new())).await {
        Ok(verdict) if verdict.passed => EXIT_SUCCESS,
        Ok(_) => EXIT_FAILURE,
        Err(e) => {
            eprintln!("Error running test suite: {e}");
            EXIT_FAILURE
        }
    }
}
