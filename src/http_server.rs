use crate::generation::routes as generation_routes;
use crate::generation::{GenerationConfig, GenerationService};
use crate::history::routes as history_routes;
use crate::history::{HistoryError, HistoryStore};
use crate::logging::routes as log_routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer as ActixHttpServer};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

const LOG_TARGET: &str = "synthetix::http_server";

/// Settings of the HTTP server process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address to bind to (e.g., "127.0.0.1:9001")
    pub bind_address: String,
    /// Directory of the sled history database
    pub history_path: PathBuf,
    /// TOML logging configuration, optional on disk
    pub log_config_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9001".to_string(),
            history_path: PathBuf::from("data/history"),
            log_config_path: "config/logging.toml".to_string(),
        }
    }
}

/// HTTP server for the generation API.
///
/// Serves every route under `/api`. The server still starts when the model
/// gateway is not configured; generation routes then answer 503.
pub struct SynthetixHttpServer {
    state: web::Data<AppState>,
    bind_address: String,
}

/// Shared application state for the HTTP server.
pub struct AppState {
    /// `None` when the gateway could not be configured
    pub service: Option<Arc<GenerationService>>,
    pub history: HistoryStore,
    pub config: GenerationConfig,
}

impl AppState {
    /// State built from `config`; a configuration error leaves the service unset.
    pub fn from_config(config: GenerationConfig, history: HistoryStore) -> Self {
        let service = if config.enabled {
            match GenerationService::from_config(config.clone()) {
                Ok(service) => Some(Arc::new(service)),
                Err(e) => {
                    warn!(target: LOG_TARGET, "Generation service not available: {}", e);
                    None
                }
            }
        } else {
            warn!(target: LOG_TARGET, "Generation is disabled by configuration");
            None
        };
        Self {
            service,
            history,
            config,
        }
    }

    pub fn with_service(service: GenerationService, history: HistoryStore, config: GenerationConfig) -> Self {
        Self {
            service: Some(Arc::new(service)),
            history,
            config,
        }
    }
}

/// Register every API route on `cfg`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/generate")
                    .route("/prompt", web::post().to(generation_routes::generate_from_prompt))
                    .route("/structured", web::post().to(generation_routes::generate_structured))
                    .route("/text", web::post().to(generation_routes::generate_text)),
            )
            .route("/prompt/enhance", web::post().to(generation_routes::enhance_prompt))
            .route("/columns/suggest", web::post().to(generation_routes::suggest_column))
            .service(
                web::scope("/dataset")
                    .route("/analyze", web::post().to(generation_routes::analyze_dataset))
                    .route("/enhance", web::post().to(generation_routes::enhance_dataset))
                    .route("/transform", web::post().to(generation_routes::transform_dataset))
                    .route("/chart", web::post().to(generation_routes::suggest_chart))
                    .route("/insights", web::post().to(generation_routes::insights))
                    .route("/query", web::post().to(generation_routes::query_dataset)),
            )
            .service(
                web::scope("/history")
                    .route("", web::get().to(history_routes::list_history))
                    .route("", web::delete().to(history_routes::clear_history))
                    .route("/{id}", web::get().to(history_routes::get_history_item))
                    .route("/{id}", web::delete().to(history_routes::delete_history_item)),
            )
            .route("/status", web::get().to(generation_routes::get_status))
            .service(
                web::scope("/logs")
                    .route("", web::get().to(log_routes::list_logs))
                    .route("/stream", web::get().to(log_routes::stream_logs))
                    .route("/config", web::get().to(log_routes::get_config))
                    .route("/features", web::put().to(log_routes::update_feature_level)),
            ),
    );
}

impl SynthetixHttpServer {
    /// Open the history store and build the generation service.
    ///
    /// The logging system is expected to be initialized by the caller.
    pub fn new(server_config: &ServerConfig, generation_config: GenerationConfig) -> Result<Self, HistoryError> {
        let history = HistoryStore::open(&server_config.history_path)?;
        info!(
            target: LOG_TARGET,
            "History store opened at {}",
            server_config.history_path.display()
        );
        Ok(Self::with_state(
            AppState::from_config(generation_config, history),
            &server_config.bind_address,
        ))
    }

    pub fn with_state(state: AppState, bind_address: &str) -> Self {
        Self {
            state: web::Data::new(state),
            bind_address: bind_address.to_string(),
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Run until the server is stopped.
    pub async fn run(&self) -> std::io::Result<()> {
        info!(target: LOG_TARGET, "HTTP server running on {}", self.bind_address);
        let state = self.state.clone();

        ActixHttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(state.clone())
                .app_data(web::JsonConfig::default().limit(4 * 1024 * 1024))
                .configure(configure_routes)
        })
        .bind(&self.bind_address)?
        .run()
        .await
    }
}
