//! Error types for the generation module

use thiserror::Error;

/// Errors raised while talking to the completion service.
///
/// Every gateway error is retryable at the discretion of the caller; the
/// gateway itself never retries.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport level failures
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the completion API
    #[error("Completion API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The service signalled a rate limit or exhausted quota
    #[error("Completion API rate limit reached: {0}")]
    RateLimited(String),

    /// The call did not finish within the configured timeout
    #[error("Completion request timed out after {0} seconds")]
    Timeout(u64),

    /// The service answered without any content
    #[error("Completion API returned no content")]
    EmptyResponse,

    /// The content could not be parsed into the expected output shape
    #[error("Completion output did not match the expected shape: {0}")]
    Shape(String),

    /// Prompt template registration or rendering failure
    #[error("Prompt template error: {0}")]
    Template(String),

    /// Missing API key, base URL, ...
    #[error("Gateway configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the service asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Errors that can occur while generating or analyzing datasets
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The schema inferrer call failed
    #[error("Schema inference failed: {0}")]
    SchemaInference(#[source] GatewayError),

    /// The inferred schema cannot be used to dispatch batches
    #[error("Could not infer a valid schema or row count from the prompt: {0}")]
    InvalidSchema(String),

    /// One batch failed terminally after exhausting its attempts
    #[error("Batch {batch_index} failed after {attempts} attempt(s): {source}")]
    BatchGeneration {
        batch_index: usize,
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    /// Every batch of a generation request failed
    #[error("All {batches} data generation batch(es) failed for {requested} requested row(s)")]
    AllBatchesFailed { requested: usize, batches: usize },

    /// An advisor received content it could not interpret
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Request validation failures
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Single-shot gateway failures, propagated unchanged
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Configuration errors (missing API keys, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// History store failures
    #[error("History error: {0}")]
    History(#[from] crate::history::HistoryError),
}

impl GenerationError {
    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::SchemaInference(_) | Self::InvalidSchema(_) => {
                "Could not infer a valid schema or row count from the prompt. Please try enhancing your prompt or be more specific.".to_string()
            }
            Self::AllBatchesFailed { .. } => {
                "All data generation batches failed. The AI may be having trouble with the request. Please try a simpler prompt.".to_string()
            }
            Self::BatchGeneration { batch_index, .. } => {
                format!("Data generation for batch {} failed. Please try again.", batch_index)
            }
            Self::InvalidData(msg) | Self::InvalidInput(msg) => msg.clone(),
            Self::Gateway(GatewayError::RateLimited(_)) => {
                "The AI service is rate limiting requests. Please wait a moment and try again.".to_string()
            }
            Self::Gateway(GatewayError::Shape(_)) => {
                "The AI returned an invalid response that could not be processed. Please try again.".to_string()
            }
            Self::Gateway(_) => "An unexpected error occurred. Please try again.".to_string(),
            Self::Configuration(_) => "The AI service is not configured.".to_string(),
            Self::History(_) => "Failed to access the generation history.".to_string(),
        }
    }
}

/// Result type for gateway calls
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = GenerationError::Gateway(GatewayError::Api {
            status: 500,
            message: "upstream stack trace".to_string(),
        });
        assert!(!err.user_message().contains("stack trace"));
    }

    #[test]
    fn test_all_batches_failed_message_suggests_simpler_prompt() {
        let err = GenerationError::AllBatchesFailed {
            requested: 3,
            batches: 1,
        };
        assert!(err.user_message().contains("simpler prompt"));
        assert!(err.to_string().contains("3 requested"));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(GatewayError::RateLimited("429".into()).is_rate_limited());
        assert!(!GatewayError::EmptyResponse.is_rate_limited());
    }
}
