//! lddscan - list the shared libraries a binary loads
//!
//! A CLI wrapper around ldd that prints dependencies as a table or JSON and
//! flags direct dependencies the binary never uses.

use clap::Parser;
use lddscan::cli::{Args, CliApp};
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    // Create and run the CLI application
    let app = CliApp::new(args);
    let exit_code = match app.run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };

    // Exit with the appropriate code
    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
