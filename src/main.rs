use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use repodrive::{Aggregator, Config, GitHubClient, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = repodrive::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        repodrive::logging::init_console_only(&config.logging.level);
    }

    // Environment overrides go after logging so rejected values are reported
    for message in config.apply_env_overrides() {
        warn!("{}", message);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("repodrive {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Serving {}/{}@{} from {}",
        config.upstream.owner, config.upstream.repo, config.upstream.branch, config.upstream.api_base
    );

    let client = match GitHubClient::new(&config.upstream) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create upstream client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let aggregator = Aggregator::new(Arc::new(client), config.aggregation.max_in_flight);

    let server = match WebServer::new(&config.web, aggregator) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
