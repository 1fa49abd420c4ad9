//! Instruction-driven dataset enhancement

use crate::generation::gateway::{invoke, CompletionGateway};
use crate::generation::prompts::{PromptLibrary, PromptTemplate};
use crate::generation::{GenerationError, GenerationResult};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EnhanceInput<'a> {
    dataset: &'a str,
    enhancements: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceAnswer {
    enhanced_dataset: String,
}

/// Applies natural-language instructions to a dataset string.
///
/// The model is asked to keep the input format; errors are not retried.
pub struct EnhancementApplier<'a> {
    gateway: &'a dyn CompletionGateway,
    library: &'a PromptLibrary,
}

impl<'a> EnhancementApplier<'a> {
    pub fn new(gateway: &'a dyn CompletionGateway, library: &'a PromptLibrary) -> Self {
        Self { gateway, library }
    }

    pub async fn enhance(&self, dataset: &str, instructions: &[String]) -> GenerationResult<String> {
        if dataset.trim().is_empty() {
            return Err(GenerationError::invalid_input("Dataset cannot be empty"));
        }
        let instructions: Vec<String> = instructions
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if instructions.is_empty() {
            return Err(GenerationError::invalid_input(
                "At least one enhancement instruction is required",
            ));
        }

        let input = EnhanceInput {
            dataset,
            enhancements: &instructions,
        };
        let answer: EnhanceAnswer =
            invoke(self.gateway, self.library, PromptTemplate::EnhanceDataset, &input).await?;
        info!(
            target: "synthetix::generation",
            "Applied {} enhancement(s), dataset grew from {} to {} chars",
            instructions.len(),
            dataset.len(),
            answer.enhanced_dataset.len()
        );
        Ok(answer.enhanced_dataset)
    }

    /// Single free-form transformation.
    pub async fn apply_instruction(&self, dataset: &str, instruction: &str) -> GenerationResult<String> {
        self.enhance(dataset, &[instruction.to_string()]).await
    }
}
