use clap::Parser;
use log::info;
use std::path::PathBuf;
use synthetix::generation::GenerationConfig;
use synthetix::logging::LoggingSystem;
use synthetix::{ServerConfig, SynthetixHttpServer};

/// Command line options for the HTTP server binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Port for the HTTP server
    #[arg(long, default_value_t = 9001)]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Directory of the history database
    #[arg(long, default_value = "data/history")]
    history_path: PathBuf,

    /// Logging configuration file
    #[arg(long, default_value = "config/logging.toml")]
    log_config: String,

    /// JSON generation config; the environment is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_address: format!("{}:{}", self.host, self.port),
            history_path: self.history_path.clone(),
            log_config_path: self.log_config.clone(),
        }
    }
}

/// Main entry point for the Synthetix HTTP server.
///
/// # Environment Variables
///
/// * `SYNTHETIX_OPENROUTER_API_KEY` - API key for the model gateway
/// * `OPENROUTER_MODEL` - Model identifier
/// * `GENERATION_*` - Pipeline knobs such as `GENERATION_BATCH_SIZE`
/// * `SYNTHETIX_LOG_LEVEL` - Default log level
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let server_config = cli.server_config();

    if let Err(e) = LoggingSystem::init_from_file(&server_config.log_config_path).await {
        eprintln!("Failed to initialize logging system, using defaults: {}", e);
        synthetix::logging::init().ok();
    }
    info!("Starting Synthetix HTTP Server...");

    let generation_config = match &cli.config {
        Some(path) => {
            let mut config = GenerationConfig::load(path)?;
            config.apply_env_vars();
            config
        }
        None => GenerationConfig::from_env_allow_empty(),
    };
    generation_config.validate_limits()?;
    info!(
        "Generation config: model {}, api key {}, batch size {}",
        generation_config.openrouter_model,
        generation_config.api_key_masked(),
        generation_config.batch_size
    );

    let http_server = SynthetixHttpServer::new(&server_config, generation_config)?;
    info!("Starting HTTP server on {}...", http_server.bind_address());
    http_server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["test"]);
        assert_eq!(cli.port, 9001);
        assert_eq!(cli.server_config().bind_address, "127.0.0.1:9001");
        assert!(cli.config.is_none());
    }

    #[test]
    fn custom_port_and_paths() {
        let cli = Cli::parse_from([
            "test",
            "--port",
            "8000",
            "--host",
            "0.0.0.0",
            "--history-path",
            "/tmp/history",
        ]);
        let server = cli.server_config();
        assert_eq!(server.bind_address, "0.0.0.0:8000");
        assert_eq!(server.history_path, std::path::PathBuf::from("/tmp/history"));
    }
}
