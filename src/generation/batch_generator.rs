//! Single-batch data generation with per-batch retry

use crate::generation::gateway::{invoke, parse_model_output, CompletionGateway};
use crate::generation::prompts::{PromptLibrary, PromptTemplate};
use crate::generation::types::{BatchRequest, ColumnSpec, Record};
use crate::generation::{GatewayError, GatewayResult, GenerationError, GenerationResult, GenerationSettings};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

const LOG_TARGET: &str = "synthetix::generation";

/// Receives batch progress events.
///
/// Passed explicitly into the generator so retry diagnostics are not a
/// process-wide side effect.
pub trait BatchObserver: Send + Sync {
    /// An attempt failed; another one follows when `attempt < max_attempts`.
    fn attempt_failed(&self, batch_index: usize, attempt: u32, max_attempts: u32, error: &GatewayError);

    /// The batch gave up after `attempts` attempts.
    fn batch_failed(&self, batch_index: usize, attempts: u32, error: &GatewayError);

    fn batch_completed(&self, batch_index: usize, records: usize, attempts: u32);

    /// Records of a successful batch lack some requested columns.
    fn columns_missing(&self, _batch_index: usize, _missing: &[String]) {}

    /// The whole request settled.
    fn generation_finished(&self, _requested: usize, _actual: usize, _failed_batches: &[usize]) {}
}

/// Observer that reports through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn attempt_failed(&self, batch_index: usize, attempt: u32, max_attempts: u32, error: &GatewayError) {
        if attempt < max_attempts {
            warn!(
                target: LOG_TARGET,
                "Batch {} attempt {} of {} failed, retrying: {}",
                batch_index, attempt, max_attempts, error
            );
        } else {
            warn!(
                target: LOG_TARGET,
                "Batch {} attempt {} of {} failed: {}",
                batch_index, attempt, max_attempts, error
            );
        }
    }

    fn batch_failed(&self, batch_index: usize, attempts: u32, error: &GatewayError) {
        error!(
            target: LOG_TARGET,
            "Batch {} failed permanently after {} attempt(s): {}",
            batch_index, attempts, error
        );
    }

    fn batch_completed(&self, batch_index: usize, records: usize, attempts: u32) {
        info!(
            target: LOG_TARGET,
            "Batch {} produced {} record(s) on attempt {}",
            batch_index, records, attempts
        );
    }

    fn columns_missing(&self, batch_index: usize, missing: &[String]) {
        warn!(
            target: LOG_TARGET,
            "Batch {} records are missing column(s): {}",
            batch_index,
            missing.join(", ")
        );
    }

    fn generation_finished(&self, requested: usize, actual: usize, failed_batches: &[usize]) {
        if failed_batches.is_empty() && actual >= requested {
            info!(target: LOG_TARGET, "Generated {} of {} requested row(s)", actual, requested);
        } else {
            warn!(
                target: LOG_TARGET,
                "Partial dataset: {} of {} requested row(s), failed batch(es): {:?}",
                actual, requested, failed_batches
            );
        }
    }
}

#[derive(Serialize)]
struct StructuredDataInput<'a> {
    columns: &'a [ColumnSpec],
    count: usize,
}

/// Generates the rows of one batch.
pub struct BatchGenerator<'a> {
    gateway: &'a dyn CompletionGateway,
    library: &'a PromptLibrary,
    settings: &'a GenerationSettings,
    observer: &'a dyn BatchObserver,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(
        gateway: &'a dyn CompletionGateway,
        library: &'a PromptLibrary,
        settings: &'a GenerationSettings,
        observer: &'a dyn BatchObserver,
    ) -> Self {
        Self {
            gateway,
            library,
            settings,
            observer,
        }
    }

    /// Generate one batch, retrying up to the configured attempt count.
    ///
    /// Only the final attempt's error is returned.
    pub async fn generate(
        &self,
        columns: &[ColumnSpec],
        batch: &BatchRequest,
    ) -> GenerationResult<Vec<Record>> {
        let max_attempts = self.settings.max_batch_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.attempt(columns, batch.size).await {
                Ok(records) => {
                    self.observer
                        .batch_completed(batch.index, records.len(), attempt);
                    let missing = missing_columns(columns, &records);
                    if !missing.is_empty() {
                        self.observer.columns_missing(batch.index, &missing);
                    }
                    return Ok(records);
                }
                Err(e) => {
                    self.observer
                        .attempt_failed(batch.index, attempt, max_attempts, &e);
                    if attempt < max_attempts {
                        let delay = if e.is_rate_limited() && !self.settings.rate_limit_backoff.is_zero() {
                            self.settings.rate_limit_backoff
                        } else {
                            self.settings.retry_delay
                        };
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        let source = last_error.unwrap_or(GatewayError::EmptyResponse);
        self.observer.batch_failed(batch.index, max_attempts, &source);
        Err(GenerationError::BatchGeneration {
            batch_index: batch.index,
            attempts: max_attempts,
            source,
        })
    }

    async fn attempt(&self, columns: &[ColumnSpec], size: usize) -> GatewayResult<Vec<Record>> {
        let input = StructuredDataInput {
            columns,
            count: size,
        };
        let value: Value =
            invoke(self.gateway, self.library, PromptTemplate::StructuredData, &input).await?;
        decode_batch(value)
    }
}

/// Decode a batch answer into records.
///
/// Accepts a bare array, or an object holding the array (or a JSON string
/// of it) under `dataset`. Every element must be a JSON object.
pub fn decode_batch(value: Value) -> GatewayResult<Vec<Record>> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("dataset") {
            Some(Value::Array(items)) => items,
            Some(Value::String(text)) => match parse_model_output(&text)? {
                Value::Array(items) => items,
                _ => return Err(GatewayError::shape("model returned non-array data for the batch")),
            },
            _ => return Err(GatewayError::shape("model returned non-array data for the batch")),
        },
        _ => return Err(GatewayError::shape("model returned non-array data for the batch")),
    };

    array
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(GatewayError::shape(format!(
                "batch element {} is not an object: {}",
                i, other
            ))),
        })
        .collect()
}

fn missing_columns(columns: &[ColumnSpec], records: &[Record]) -> Vec<String> {
    let missing: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| {
            columns
                .iter()
                .filter(move |c| !record.contains_key(&c.name))
                .map(|c| c.name.as_str())
        })
        .collect();
    missing.into_iter().map(str::to_string).collect()
}
