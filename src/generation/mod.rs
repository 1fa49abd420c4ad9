//! # Dataset generation
//!
//! Prompt-driven generation, enhancement and analysis of datasets through a
//! hosted generative model.
//!
//! A free-text prompt becomes a dataset in two steps:
//!
//! 1. [`SchemaInferrer`] asks the model for columns, a row count and a topic.
//! 2. [`DatasetOrchestrator`] splits the rows into batches of at most
//!    `batch_size`, runs them concurrently through [`BatchGenerator`] (which
//!    retries each batch on its own) and concatenates the surviving batches
//!    in order.
//!
//! Every model interaction goes through the [`CompletionGateway`] trait, so
//! the pipeline can be driven by [`OpenRouterGateway`] or by a scripted test
//! double.

pub mod advisors;
pub mod batch_generator;
pub mod config;
pub mod dataset_format;
pub mod enhancement;
pub mod error;
pub mod gateway;
pub mod openrouter_service;
pub mod orchestrator;
pub mod prompts;
pub mod routes;
pub mod schema_inference;
pub mod service;
pub mod text_generator;
pub mod types;

pub use advisors::{
    ChartSuggestion, ChartType, ColumnSuggestion, DataInsights, DatasetAdvisor, DatasetAnalysis,
    EnhancedPrompt, QueryAnswer,
};
pub use batch_generator::{BatchGenerator, BatchObserver, LogObserver};
pub use config::{GenerationConfig, GenerationSettings};
pub use dataset_format::DatasetFormat;
pub use enhancement::EnhancementApplier;
pub use error::{GatewayError, GatewayResult, GenerationError};
pub use gateway::{invoke, CompletionGateway, PromptRequest};
pub use openrouter_service::OpenRouterGateway;
pub use orchestrator::DatasetOrchestrator;
pub use prompts::{PromptLibrary, PromptTemplate};
pub use schema_inference::SchemaInferrer;
pub use service::GenerationService;
pub use text_generator::{TextRequest, TextSampleGenerator};
pub use types::{
    plan_batches, BatchRequest, BatchResult, ColumnSpec, GeneratedDataset, InferredSchema, Record,
};

/// Result type for generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Response envelope shared by every generation endpoint
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActionResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub error: bool,
}

impl<T> ActionResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: "success".to_string(),
            data: Some(data),
            error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            error: true,
        }
    }
}
