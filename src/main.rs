//! aie2e - natural-language browser tests driven over MCP
//!
//! Loads test sessions from YAML files and runs them on a remote executor,
//! reporting progress as it streams back.

use aie2e::cli::{self, Args};
use aie2e::common::logging;
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_cli(args.verbose);

    let code = cli::run(args).await;
    std::process::exit(code);
}
