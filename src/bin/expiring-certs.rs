use clap::Parser;
use expiring_certs::{run, Cli, Config};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

/// A fatal error stopped the run before anything was reported.
const EXIT_ERROR: i32 = 1;
/// `--fail-on-match` was set and at least one certificate is expiring.
const EXIT_EXPIRING: i32 = 3;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    let stdout = io::stdout();
    let count = match run(&config, &mut stdout.lock()) {
        Ok(count) => count,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    if config.fail_on_match && count > 0 {
        process::exit(EXIT_EXPIRING);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
