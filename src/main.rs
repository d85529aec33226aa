use relinkdb::config::{self, Config};
use relinkdb::{repl, DatabaseClient};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};

fn load(path: Option<&String>) -> relinkdb::Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => match config::default_config_path() {
            Some(path) if path.exists() => config::load_config(path),
            _ => Ok(Config::default()),
        },
    }
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();
    let config = match load(args.get(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize the logging system using tracing subscriber; logs go to
    // stderr so shell output stays machine-readable.
    let level = config
        .logging
        .tracing_level()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    info!("Starting relinkdb...");

    let mut client = match DatabaseClient::connect(config.database) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    if let Err(e) = repl::run_repl(&mut client, stdin.lock(), io::stdout().lock()) {
        error!("Shell terminated: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
