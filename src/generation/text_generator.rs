//! Synthetic text samples

use crate::generation::gateway::{invoke, CompletionGateway};
use crate::generation::prompts::{PromptLibrary, PromptTemplate};
use crate::generation::{GenerationError, GenerationResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Largest number of samples one request may ask for
pub const MAX_TEXT_SAMPLES: usize = 10;

/// Parameters of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    /// Kind of text, e.g. "product review"
    pub text_type: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    pub count: usize,
}

impl TextRequest {
    pub fn new(text_type: impl Into<String>, count: usize) -> Self {
        Self {
            text_type: text_type.into(),
            topic: None,
            length: None,
            style: None,
            count,
        }
    }

    pub fn validate(&self) -> GenerationResult<()> {
        if self.text_type.trim().is_empty() {
            return Err(GenerationError::invalid_input("Text type is required"));
        }
        if self.count == 0 || self.count > MAX_TEXT_SAMPLES {
            return Err(GenerationError::invalid_input(format!(
                "Number of samples must be between 1 and {}",
                MAX_TEXT_SAMPLES
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct TextAnswer {
    #[serde(default)]
    texts: Vec<String>,
}

/// Generates text samples one call at a time.
pub struct TextSampleGenerator<'a> {
    gateway: &'a dyn CompletionGateway,
    library: &'a PromptLibrary,
}

impl<'a> TextSampleGenerator<'a> {
    pub fn new(gateway: &'a dyn CompletionGateway, library: &'a PromptLibrary) -> Self {
        Self { gateway, library }
    }

    /// Calls the model `request.count` times in sequence.
    ///
    /// Failed or empty calls are skipped, so fewer samples than requested may
    /// come back.
    pub async fn generate(&self, request: &TextRequest) -> GenerationResult<Vec<String>> {
        request.validate()?;

        let mut samples = Vec::with_capacity(request.count);
        for i in 1..=request.count {
            match invoke::<_, TextAnswer>(
                self.gateway,
                self.library,
                PromptTemplate::SyntheticText,
                request,
            )
            .await
            {
                Ok(answer) => match answer.texts.into_iter().find(|t| !t.trim().is_empty()) {
                    Some(text) => samples.push(text),
                    None => warn!(
                        target: "synthetix::generation",
                        "Text sample {} of {} came back empty, skipping",
                        i, request.count
                    ),
                },
                Err(e) => warn!(
                    target: "synthetix::generation",
                    "Text sample {} of {} failed, skipping: {}",
                    i, request.count, e
                ),
            }
        }

        info!(
            target: "synthetix::generation",
            "Generated {} of {} '{}' text sample(s)",
            samples.len(),
            request.count,
            request.text_type
        );
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GatewayError;
    use crate::testing::ScriptedGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_failed_and_empty_samples_are_skipped() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({"texts": ["Great product."]}));
        gateway.push_err(GatewayError::EmptyResponse);
        gateway.push_ok(json!({"texts": []}));
        gateway.push_ok(json!({"texts": ["Would buy again."]}));
        let library = PromptLibrary::new().unwrap();

        let samples = TextSampleGenerator::new(&gateway, &library)
            .generate(&TextRequest::new("product review", 4))
            .await
            .unwrap();

        assert_eq!(samples, vec!["Great product.", "Would buy again."]);
        assert_eq!(gateway.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_prompt_includes_optional_fields() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({"texts": ["Hello"]}));
        let library = PromptLibrary::new().unwrap();

        let mut request = TextRequest::new("tweet", 1);
        request.topic = Some("rust".to_string());
        TextSampleGenerator::new(&gateway, &library)
            .generate(&request)
            .await
            .unwrap();

        let prompt = &gateway.calls()[0].prompt;
        assert!(prompt.contains("Type of text: tweet"));
        assert!(prompt.contains("topic: rust"));
        assert!(!prompt.contains("following style"));
    }

    #[tokio::test]
    async fn test_count_bounds() {
        let gateway = ScriptedGateway::new();
        let library = PromptLibrary::new().unwrap();
        let generator = TextSampleGenerator::new(&gateway, &library);

        assert!(generator.generate(&TextRequest::new("tweet", 0)).await.is_err());
        assert!(generator.generate(&TextRequest::new("tweet", 11)).await.is_err());
        assert!(generator.generate(&TextRequest::new("  ", 1)).await.is_err());
        assert!(gateway.calls().is_empty());
    }
}
