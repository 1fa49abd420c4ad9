//! Prompt-to-dataset pipeline: schema inference, batch fan-out and aggregation

use crate::generation::batch_generator::{BatchGenerator, BatchObserver, LogObserver};
use crate::generation::gateway::CompletionGateway;
use crate::generation::prompts::PromptLibrary;
use crate::generation::schema_inference::SchemaInferrer;
use crate::generation::types::{plan_batches, BatchResult, ColumnSpec, GeneratedDataset};
use crate::generation::{GenerationError, GenerationResult, GenerationSettings};
use crate::logging::features::{LogFeature, PerformanceTimer};
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;

const LOG_TARGET: &str = "synthetix::generation";

/// Turns a prompt or a declared schema into a dataset.
///
/// Batches run concurrently and every batch settles before the records are
/// assembled in batch order. Failed batches are dropped; the request only
/// fails when no batch produced records.
pub struct DatasetOrchestrator {
    gateway: Arc<dyn CompletionGateway>,
    library: Arc<PromptLibrary>,
    settings: GenerationSettings,
    observer: Arc<dyn BatchObserver>,
}

impl DatasetOrchestrator {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        library: Arc<PromptLibrary>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            gateway,
            library,
            settings,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the default logging observer.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Infer a schema from `prompt` and generate the rows it asks for.
    pub async fn generate_from_prompt(&self, prompt: &str) -> GenerationResult<GeneratedDataset> {
        let inferrer = SchemaInferrer::new(
            self.gateway.as_ref(),
            &self.library,
            self.settings.default_row_count,
        );
        let schema = inferrer
            .infer(prompt)
            .await
            .map_err(GenerationError::SchemaInference)?;

        let row_count = schema
            .validate(self.settings.max_prompt_rows)
            .map_err(GenerationError::invalid_schema)?;
        self.generate_rows(schema.columns, row_count, schema.topic).await
    }

    /// Generate `count` rows for user-declared columns, without inference.
    pub async fn generate_structured(
        &self,
        columns: Vec<ColumnSpec>,
        count: usize,
    ) -> GenerationResult<GeneratedDataset> {
        if columns.is_empty() {
            return Err(GenerationError::invalid_input("At least one column is required"));
        }
        if columns.iter().any(|c| c.name.trim().is_empty()) {
            return Err(GenerationError::invalid_input("Column names cannot be empty"));
        }
        if count == 0 || count > self.settings.max_structured_rows {
            return Err(GenerationError::invalid_input(format!(
                "Row count must be between 1 and {}",
                self.settings.max_structured_rows
            )));
        }
        self.generate_rows(columns, count, String::new()).await
    }

    async fn generate_rows(
        &self,
        columns: Vec<ColumnSpec>,
        row_count: usize,
        topic: String,
    ) -> GenerationResult<GeneratedDataset> {
        let plan = plan_batches(row_count, self.settings.batch_size);
        if plan.is_empty() {
            return Err(GenerationError::invalid_schema("no batches to generate"));
        }
        info!(
            target: LOG_TARGET,
            "Generating {} row(s) in {} batch(es) of up to {}",
            row_count,
            plan.len(),
            self.settings.batch_size
        );
        let timer = PerformanceTimer::new(LogFeature::Generation, format!("generate {} row(s)", row_count));

        let generator = BatchGenerator::new(
            self.gateway.as_ref(),
            &self.library,
            &self.settings,
            self.observer.as_ref(),
        );
        let outcomes = join_all(plan.iter().map(|batch| {
            let generator = &generator;
            let columns = &columns;
            async move {
                match generator.generate(columns, batch).await {
                    Ok(records) => BatchResult::Success(records),
                    Err(cause) => BatchResult::Failure {
                        batch_index: batch.index,
                        cause,
                    },
                }
            }
        }))
        .await;
        timer.finish();

        let mut records = Vec::with_capacity(plan.iter().map(|batch| batch.size).sum());
        let mut failed_batches = Vec::new();
        for outcome in outcomes {
            match outcome {
                BatchResult::Success(batch_records) => records.extend(batch_records),
                BatchResult::Failure { batch_index, cause } => {
                    warn!(target: LOG_TARGET, "Dropping batch {}: {}", batch_index, cause);
                    failed_batches.push(batch_index);
                }
            }
        }

        self.observer
            .generation_finished(row_count, records.len(), &failed_batches);

        if records.is_empty() {
            return Err(GenerationError::AllBatchesFailed {
                requested: row_count,
                batches: plan.len(),
            });
        }

        Ok(GeneratedDataset {
            actual_count: records.len(),
            records,
            requested_count: row_count,
            failed_batches,
            topic,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::prompts::PromptTemplate;
    use crate::generation::GatewayError;
    use crate::testing::{requested_rows, sample_rows, schema_answer, ScriptedGateway};
    use std::time::Duration;

    fn orchestrator(gateway: Arc<ScriptedGateway>) -> DatasetOrchestrator {
        DatasetOrchestrator::new(
            gateway,
            Arc::new(PromptLibrary::new().unwrap()),
            GenerationSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_schema_makes_no_batch_calls() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_for(
            PromptTemplate::InferSchema,
            Ok(schema_answer(&["name"], 0, "nothing")),
        );

        let result = orchestrator(gateway.clone())
            .generate_from_prompt("zero rows of anything")
            .await;

        assert!(matches!(result, Err(GenerationError::InvalidSchema(_))));
        assert_eq!(gateway.calls_for(PromptTemplate::StructuredData), 0);
    }

    #[tokio::test]
    async fn test_inference_failure_is_schema_inference_error() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_for(PromptTemplate::InferSchema, Err(GatewayError::Timeout(60)));

        let result = orchestrator(gateway)
            .generate_from_prompt("users with name and email")
            .await;
        assert!(matches!(
            result,
            Err(GenerationError::SchemaInference(GatewayError::Timeout(60)))
        ));
    }

    #[tokio::test]
    async fn test_records_keep_batch_order_when_first_batch_is_slowest() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .with_responder(|request| {
                    let size = requested_rows(request).unwrap_or(0);
                    let column = format!("batch_of_{}", size);
                    Ok(sample_rows(&[column.as_str()], size))
                })
                .with_latency_by(|request| match requested_rows(request) {
                    Some(50) => Duration::from_millis(80),
                    _ => Duration::ZERO,
                }),
        );
        gateway.push_for(
            PromptTemplate::InferSchema,
            Ok(schema_answer(&["value"], 70, "numbers")),
        );

        let dataset = orchestrator(gateway)
            .generate_from_prompt("70 numbers please")
            .await
            .unwrap();

        assert_eq!(dataset.actual_count, 70);
        assert!(dataset.records[..50]
            .iter()
            .all(|r| r.contains_key("batch_of_50")));
        assert_eq!(dataset.records[0]["batch_of_50"], "batch_of_50_0");
        assert_eq!(dataset.records[49]["batch_of_50"], "batch_of_50_49");
        assert!(dataset.records[50..]
            .iter()
            .all(|r| r.contains_key("batch_of_20")));
        assert!(!dataset.is_partial());
    }

    #[tokio::test]
    async fn test_row_count_above_limit_makes_no_batch_calls() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_for(
            PromptTemplate::InferSchema,
            Ok(schema_answer(&["id"], 1_000_000_000_000_000, "ids")),
        );

        let result = orchestrator(gateway.clone())
            .generate_from_prompt("a quadrillion identifiers")
            .await;

        assert!(matches!(result, Err(GenerationError::InvalidSchema(_))));
        assert_eq!(gateway.calls_for(PromptTemplate::StructuredData), 0);
    }

    #[tokio::test]
    async fn test_structured_rejects_out_of_range_count() {
        let gateway = Arc::new(ScriptedGateway::new());
        let orch = orchestrator(gateway.clone());

        let columns = vec![ColumnSpec::new("id", "uuid")];
        assert!(matches!(
            orch.generate_structured(columns.clone(), 0).await,
            Err(GenerationError::InvalidInput(_))
        ));
        assert!(matches!(
            orch.generate_structured(columns, 101).await,
            Err(GenerationError::InvalidInput(_))
        ));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_structured_skips_inference() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_for(PromptTemplate::StructuredData, Ok(sample_rows(&["id"], 7)));

        let dataset = orchestrator(gateway.clone())
            .generate_structured(vec![ColumnSpec::new("id", "uuid")], 7)
            .await
            .unwrap();

        assert_eq!(dataset.actual_count, 7);
        assert_eq!(gateway.calls_for(PromptTemplate::InferSchema), 0);
    }
}
