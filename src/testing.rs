//! Test doubles for the completion gateway

use crate::generation::gateway::{CompletionGateway, PromptRequest};
use crate::generation::prompts::PromptTemplate;
use crate::generation::{GatewayError, GatewayResult};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Responder = dyn Fn(&PromptRequest) -> GatewayResult<Value> + Send + Sync;
type Latency = dyn Fn(&PromptRequest) -> Duration + Send + Sync;

/// Gateway that answers from scripted queues and records every call.
///
/// Answers are taken, in order, from the queue of the call's template, then
/// from the queue shared by all templates, then from the responder. A call
/// with nothing scripted fails with [`GatewayError::EmptyResponse`].
#[derive(Default)]
pub struct ScriptedGateway {
    by_template: Mutex<HashMap<PromptTemplate, VecDeque<GatewayResult<Value>>>>,
    shared: Mutex<VecDeque<GatewayResult<Value>>>,
    responder: Option<Arc<Responder>>,
    latency: Option<Arc<Latency>>,
    calls: Mutex<Vec<PromptRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls nothing was queued for with `responder`.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&PromptRequest) -> GatewayResult<Value> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Delay every answer, so concurrent calls overlap.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.with_latency_by(move |_| latency)
    }

    /// Delay each answer by a per-request amount, so calls can settle out of order.
    pub fn with_latency_by<F>(mut self, latency: F) -> Self
    where
        F: Fn(&PromptRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(latency));
        self
    }

    pub fn push_ok(&self, value: Value) {
        lock(&self.shared).push_back(Ok(value));
    }

    pub fn push_err(&self, error: GatewayError) {
        lock(&self.shared).push_back(Err(error));
    }

    pub fn push_for(&self, template: PromptTemplate, result: GatewayResult<Value>) {
        lock(&self.by_template)
            .entry(template)
            .or_default()
            .push_back(result);
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<PromptRequest> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, template: PromptTemplate) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.template == template)
            .count()
    }

    /// Highest number of calls that were pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_answer(&self, request: &PromptRequest) -> GatewayResult<Value> {
        if let Some(result) = lock(&self.by_template)
            .get_mut(&request.template)
            .and_then(|queue| queue.pop_front())
        {
            return result;
        }
        if let Some(result) = lock(&self.shared).pop_front() {
            return result;
        }
        match &self.responder {
            Some(responder) => responder(request),
            None => Err(GatewayError::EmptyResponse),
        }
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(&self, request: PromptRequest) -> GatewayResult<Value> {
        lock(&self.calls).push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = &self.latency {
            let delay = latency(&request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        let answer = self.next_answer(&request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer
    }
}

/// `count` synthetic rows with a value for every column in `columns`.
pub fn sample_rows(columns: &[&str], count: usize) -> Value {
    let rows: Vec<Value> = (0..count)
        .map(|i| {
            let mut row = Map::new();
            for column in columns {
                row.insert(column.to_string(), json!(format!("{}_{}", column, i)));
            }
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}

/// Inferred-schema answer for the given column names and row count.
pub fn schema_answer(columns: &[&str], count: i64, topic: &str) -> Value {
    let columns: Vec<Value> = columns
        .iter()
        .map(|name| json!({"name": name, "type": "string"}))
        .collect();
    json!({"columns": columns, "count": count, "topic": topic})
}

/// Row count requested by a structured-data prompt.
pub fn requested_rows(request: &PromptRequest) -> Option<usize> {
    let marker = "Generate exactly ";
    let start = request.prompt.find(marker)? + marker.len();
    let rest = &request.prompt[start..];
    let end = rest.find(' ')?;
    rest[..end].parse().ok()
}
