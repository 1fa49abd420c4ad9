//! # Synthetix
//!
//! Synthetic dataset generation, enhancement and analysis over a hosted
//! generative model, with an HTTP API and a local generation history.

pub mod generation;
pub mod history;
pub mod http_server;
pub mod logging;
pub mod testing;
pub mod web_logger;

pub use generation::{
    ColumnSpec, CompletionGateway, DatasetOrchestrator, GatewayError, GeneratedDataset,
    GenerationConfig, GenerationError, GenerationResult, GenerationService,
};
pub use history::{HistoryItem, HistoryKind, HistoryStore};
pub use http_server::{AppState, ServerConfig, SynthetixHttpServer};
