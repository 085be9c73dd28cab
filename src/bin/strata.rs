//! Strata CLI Binary
//!
//! Command-line interface for the strata snapshot engine.

use clap::Parser;
use std::process;
use strata::cli::{Cli, RunContext};
use strata::config::{ConfigLoader, StrataConfig};
use strata::logging::{init_logging, LoggingConfig};
use tracing::{debug, error};

fn main() {
    let cli = Cli::parse();

    let mut config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", strata::cli::map_error(&e));
            process::exit(1);
        }
    };

    apply_timeout(&cli, &mut config);
    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }
    debug!(store = %config.store.path.display(), "Configuration loaded");

    let context = match RunContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error opening store: {}", e);
            eprintln!("{}", strata::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", strata::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and the loaded config.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, config: &StrataConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        logging.file = file.clone();
    }
    logging
}

/// `--timeout` overrides `snapshot.timeout_secs`.
fn apply_timeout(cli: &Cli, config: &mut StrataConfig) {
    if let Some(secs) = cli.timeout {
        config.snapshot.timeout_secs = Some(secs);
    }
}
