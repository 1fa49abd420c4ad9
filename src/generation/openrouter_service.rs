//! OpenRouter implementation of the completion gateway

use crate::generation::gateway::{parse_model_output, truncate_for_log, CompletionGateway, PromptRequest};
use crate::generation::{GatewayError, GatewayResult, GenerationConfig};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LOG_TARGET: &str = "synthetix::gateway";

/// OpenRouter chat-completions gateway
///
/// Each call is a single HTTP request bounded by the configured timeout.
pub struct OpenRouterGateway {
    client: Client,
    config: GenerationConfig,
}

/// Request to OpenRouter API
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<OpenRouterMessage>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Message in OpenRouter request
#[derive(Debug, Serialize)]
struct OpenRouterMessage {
    role: String,
    content: String,
}

/// Response from OpenRouter API
#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl OpenRouterGateway {
    /// Create a new OpenRouter gateway
    pub fn new(config: GenerationConfig) -> GatewayResult<Self> {
        config
            .validate()
            .map_err(|e| GatewayError::configuration(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn build_request(&self, request: &PromptRequest) -> OpenRouterRequest {
        let system = format!(
            "You are a data generation service. Respond with valid JSON only, no prose and no markdown. \
             The response must follow this shape:\n{}",
            serde_json::to_string_pretty(&request.output_shape).unwrap_or_else(|_| "{}".to_string())
        );
        OpenRouterRequest {
            model: self.config.openrouter_model.clone(),
            messages: vec![
                OpenRouterMessage {
                    role: "system".to_string(),
                    content: system,
                },
                OpenRouterMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            max_tokens: Some(8000),
            temperature: Some(0.7),
        }
    }

    async fn send(&self, body: &OpenRouterRequest) -> GatewayResult<String> {
        let url = format!("{}/chat/completions", self.config.openrouter_base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.openrouter_api_key),
            )
            .header("Content-Type", "application/json")
            .header("X-Title", "Synthetix")
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, error_text));
        }

        let parsed: OpenRouterResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::shape(format!("Malformed completion envelope: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                target: LOG_TARGET,
                "OpenRouter usage - prompt tokens: {:?}, completion tokens: {:?}, total tokens: {:?}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GatewayError::EmptyResponse)
    }

    fn classify_transport_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.config.timeout_seconds)
        } else {
            GatewayError::Http(error)
        }
    }
}

fn classify_status(status: StatusCode, message: String) -> GatewayError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::RateLimited(message)
    } else {
        GatewayError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenRouterGateway {
    async fn complete(&self, request: PromptRequest) -> GatewayResult<Value> {
        info!(
            target: LOG_TARGET,
            "Sending '{}' prompt to model {} ({} chars)",
            request.template.id(),
            self.config.openrouter_model,
            request.prompt.len()
        );
        debug!(target: LOG_TARGET, "Prompt: {}", truncate_for_log(&request.prompt, 1000));

        let body = self.build_request(&request);
        let content = self.send(&body).await?;
        debug!(
            target: LOG_TARGET,
            "Model answer ({} chars): {}",
            content.len(),
            truncate_for_log(&content, 1000)
        );

        parse_model_output(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::prompts::PromptTemplate;

    fn create_test_gateway() -> OpenRouterGateway {
        let config = GenerationConfig {
            openrouter_api_key: "test-key".to_string(),
            ..Default::default()
        };
        OpenRouterGateway::new(config).unwrap()
    }

    #[test]
    fn test_creation_requires_api_key() {
        assert!(matches!(
            OpenRouterGateway::new(GenerationConfig::default()),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn test_request_carries_shape_and_prompt() {
        let gateway = create_test_gateway();
        let request = PromptRequest {
            template: PromptTemplate::QueryDataset,
            prompt: "How many rows?".to_string(),
            output_shape: PromptTemplate::QueryDataset.output_shape(),
        };

        let body = gateway.build_request(&request);
        assert_eq!(body.model, "anthropic/claude-3.5-sonnet");
        assert_eq!(body.messages.len(), 2);
        assert!(body.messages[0].content.contains("\"answer\""));
        assert_eq!(body.messages[1].content, "How many rows?");
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into()).is_rate_limited());
        match classify_status(StatusCode::BAD_GATEWAY, "oops".into()) {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "oops");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_without_content_is_accepted_by_decoder() {
        let parsed: OpenRouterResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
