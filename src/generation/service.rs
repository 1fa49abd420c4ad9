//! Facade wiring every generation component behind validated entry points

use crate::generation::advisors::{
    ChartSuggestion, ColumnSuggestion, DataInsights, DatasetAdvisor, DatasetAnalysis, EnhancedPrompt,
    QueryAnswer,
};
use crate::generation::batch_generator::BatchObserver;
use crate::generation::enhancement::EnhancementApplier;
use crate::generation::gateway::CompletionGateway;
use crate::generation::openrouter_service::OpenRouterGateway;
use crate::generation::orchestrator::DatasetOrchestrator;
use crate::generation::prompts::PromptLibrary;
use crate::generation::text_generator::{TextRequest, TextSampleGenerator};
use crate::generation::types::{ColumnSpec, GeneratedDataset};
use crate::generation::{GenerationConfig, GenerationError, GenerationResult, GenerationSettings};
use log::info;
use std::sync::Arc;

const MIN_PROMPT_CHARS: usize = 10;
const MIN_ENHANCE_PROMPT_CHARS: usize = 3;
const MIN_DATASET_CHARS: usize = 10;
const MIN_QUERY_CHARS: usize = 5;

/// Generation and analysis operations for the HTTP layer.
pub struct GenerationService {
    gateway: Arc<dyn CompletionGateway>,
    library: Arc<PromptLibrary>,
    orchestrator: DatasetOrchestrator,
}

impl GenerationService {
    /// Service backed by OpenRouter
    pub fn from_config(config: GenerationConfig) -> GenerationResult<Self> {
        let settings = config.settings();
        let gateway = OpenRouterGateway::new(config)
            .map_err(|e| GenerationError::configuration_error(e.to_string()))?;
        info!(target: "synthetix::generation", "Generation service using OpenRouter");
        Self::new(Arc::new(gateway), settings)
    }

    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: GenerationSettings) -> GenerationResult<Self> {
        let library = Arc::new(PromptLibrary::new()?);
        let orchestrator = DatasetOrchestrator::new(gateway.clone(), library.clone(), settings);
        Ok(Self {
            gateway,
            library,
            orchestrator,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.orchestrator = self.orchestrator.with_observer(observer);
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        self.orchestrator.settings()
    }

    pub async fn generate_from_prompt(&self, prompt: &str) -> GenerationResult<GeneratedDataset> {
        let prompt = min_chars(prompt, MIN_PROMPT_CHARS, "Prompt")?;
        self.orchestrator.generate_from_prompt(prompt).await
    }

    pub async fn generate_structured(
        &self,
        columns: Vec<ColumnSpec>,
        count: usize,
    ) -> GenerationResult<GeneratedDataset> {
        self.orchestrator.generate_structured(columns, count).await
    }

    pub async fn generate_text(&self, request: &TextRequest) -> GenerationResult<Vec<String>> {
        TextSampleGenerator::new(self.gateway.as_ref(), &self.library)
            .generate(request)
            .await
    }

    pub async fn enhance_prompt(&self, prompt: &str) -> GenerationResult<EnhancedPrompt> {
        let prompt = min_chars(prompt, MIN_ENHANCE_PROMPT_CHARS, "Prompt")?;
        self.advisor().enhance_prompt(prompt).await
    }

    pub async fn suggest_column(
        &self,
        column_name: &str,
        column_description: Option<&str>,
    ) -> GenerationResult<ColumnSuggestion> {
        self.advisor()
            .suggest_column_type(column_name, column_description)
            .await
    }

    pub async fn analyze_dataset(&self, dataset: &str) -> GenerationResult<DatasetAnalysis> {
        let dataset = min_chars(dataset, MIN_DATASET_CHARS, "Dataset")?;
        self.advisor().analyze(dataset).await
    }

    pub async fn enhance_dataset(&self, dataset: &str, enhancements: &[String]) -> GenerationResult<String> {
        EnhancementApplier::new(self.gateway.as_ref(), &self.library)
            .enhance(dataset, enhancements)
            .await
    }

    pub async fn transform_dataset(&self, dataset: &str, instruction: &str) -> GenerationResult<String> {
        EnhancementApplier::new(self.gateway.as_ref(), &self.library)
            .apply_instruction(dataset, instruction)
            .await
    }

    pub async fn suggest_chart(&self, dataset: &str) -> GenerationResult<ChartSuggestion> {
        self.advisor().suggest_chart(dataset).await
    }

    pub async fn insights(&self, dataset: &str) -> GenerationResult<DataInsights> {
        let dataset = min_chars(dataset, MIN_DATASET_CHARS, "Dataset")?;
        self.advisor().insights(dataset).await
    }

    pub async fn query(&self, dataset: &str, query: &str) -> GenerationResult<QueryAnswer> {
        let dataset = min_chars(dataset, MIN_DATASET_CHARS, "Dataset")?;
        let query = min_chars(query, MIN_QUERY_CHARS, "Question")?;
        self.advisor().query(dataset, query).await
    }

    fn advisor(&self) -> DatasetAdvisor<'_> {
        let settings = self.orchestrator.settings();
        DatasetAdvisor::new(
            self.gateway.as_ref(),
            &self.library,
            settings.max_dataset_chars,
            settings.default_row_count,
        )
    }
}

fn min_chars<'t>(value: &'t str, min: usize, what: &str) -> GenerationResult<&'t str> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min {
        return Err(GenerationError::invalid_input(format!(
            "{} must be at least {} characters long.",
            what, min
        )));
    }
    Ok(trimmed)
}
