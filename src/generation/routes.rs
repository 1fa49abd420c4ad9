//! HTTP route handlers for the generation API

use crate::generation::text_generator::TextRequest;
use crate::generation::types::ColumnSpec;
use crate::generation::{ActionResponse, GenerationError, GenerationService};
use crate::history::{quoted_title, HistoryKind};
use crate::http_server::AppState;
use crate::{log_http_error, log_http_info, log_http_warn};
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptBody {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StructuredBody {
    pub columns: Vec<ColumnSpec>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ColumnBody {
    pub column_name: String,
    #[serde(default)]
    pub column_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetBody {
    pub dataset: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnhanceBody {
    pub dataset: String,
    pub enhancements: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransformBody {
    pub dataset: String,
    pub instruction: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryBody {
    pub dataset: String,
    pub query: String,
}

/// Map a generation failure to a status code and a user-facing message.
pub fn error_response(e: &GenerationError) -> HttpResponse {
    let body = ActionResponse::<Value>::failure(e.user_message());
    match e {
        GenerationError::InvalidInput(_) | GenerationError::InvalidData(_) => {
            HttpResponse::BadRequest().json(body)
        }
        GenerationError::Configuration(_) => HttpResponse::ServiceUnavailable().json(body),
        GenerationError::History(_) => HttpResponse::InternalServerError().json(body),
        _ => HttpResponse::BadGateway().json(body),
    }
}

fn unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ActionResponse::<Value>::failure(
        "The AI service is not configured. Set SYNTHETIX_OPENROUTER_API_KEY and restart the server.",
    ))
}

fn service(state: &AppState) -> Option<Arc<GenerationService>> {
    state.service.clone()
}

/// Best effort: a history failure never fails the request.
fn remember(state: &AppState, kind: HistoryKind, title: String, data: Value) {
    if let Err(e) = state.history.record(kind, title, data) {
        log_http_warn!("Failed to store history item: {}", e);
    }
}

fn respond<T: Serialize>(operation: &str, result: Result<T, GenerationError>) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(ActionResponse::success(data)),
        Err(e) => {
            log_http_error!("{} failed: {}", operation, e);
            error_response(&e)
        }
    }
}

pub async fn generate_from_prompt(
    body: web::Json<PromptBody>,
    state: web::Data<AppState>,
) -> impl Responder {
    log_http_info!("Received generate-from-prompt request");
    let Some(service) = service(&state) else {
        return unavailable();
    };

    match service.generate_from_prompt(&body.prompt).await {
        Ok(dataset) => {
            if dataset.is_partial() {
                log_http_warn!(
                    "Returning partial dataset: {} of {} row(s)",
                    dataset.actual_count,
                    dataset.requested_count
                );
            }
            let serialized = dataset.to_json_pretty();
            let data = Value::Array(dataset.records.into_iter().map(Value::Object).collect());
            remember(
                &state,
                HistoryKind::Prompt,
                quoted_title("From Prompt", body.prompt.trim()),
                data,
            );
            HttpResponse::Ok().json(ActionResponse::success(serialized))
        }
        Err(e) => {
            log_http_error!("Generate from prompt failed: {}", e);
            error_response(&e)
        }
    }
}

pub async fn generate_structured(
    body: web::Json<StructuredBody>,
    state: web::Data<AppState>,
) -> impl Responder {
    log_http_info!("Received structured generation request");
    let Some(service) = service(&state) else {
        return unavailable();
    };
    let StructuredBody { columns, count } = body.into_inner();
    let title = format!(
        "Structured: {}",
        columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    match service.generate_structured(columns, count).await {
        Ok(dataset) => {
            let data = Value::Array(dataset.records.into_iter().map(Value::Object).collect());
            remember(&state, HistoryKind::Structured, title, data.clone());
            HttpResponse::Ok().json(ActionResponse::success(data))
        }
        Err(e) => {
            log_http_error!("Structured generation failed: {}", e);
            error_response(&e)
        }
    }
}

pub async fn generate_text(body: web::Json<TextRequest>, state: web::Data<AppState>) -> impl Responder {
    log_http_info!("Received text generation request");
    let Some(service) = service(&state) else {
        return unavailable();
    };

    match service.generate_text(&body).await {
        Ok(texts) if texts.is_empty() => HttpResponse::BadGateway().json(ActionResponse::<Value>::failure(
            "No text samples could be generated. Please try again.",
        )),
        Ok(texts) => {
            remember(
                &state,
                HistoryKind::Text,
                format!("Text: {}", body.text_type.trim()),
                json!(texts),
            );
            HttpResponse::Ok().json(ActionResponse::success(texts))
        }
        Err(e) => {
            log_http_error!("Text generation failed: {}", e);
            error_response(&e)
        }
    }
}

pub async fn enhance_prompt(body: web::Json<PromptBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    respond("Prompt enhancement", service.enhance_prompt(&body.prompt).await)
}

pub async fn suggest_column(body: web::Json<ColumnBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    respond(
        "Column suggestion",
        service
            .suggest_column(&body.column_name, body.column_description.as_deref())
            .await,
    )
}

pub async fn analyze_dataset(body: web::Json<DatasetBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    respond("Dataset analysis", service.analyze_dataset(&body.dataset).await)
}

pub async fn enhance_dataset(body: web::Json<EnhanceBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    match service.enhance_dataset(&body.dataset, &body.enhancements).await {
        Ok(enhanced) => {
            remember(&state, HistoryKind::Enhanced, "Enhanced Dataset".to_string(), json!(enhanced));
            HttpResponse::Ok().json(ActionResponse::success(enhanced))
        }
        Err(e) => {
            log_http_error!("Dataset enhancement failed: {}", e);
            error_response(&e)
        }
    }
}

pub async fn transform_dataset(
    body: web::Json<TransformBody>,
    state: web::Data<AppState>,
) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    match service.transform_dataset(&body.dataset, &body.instruction).await {
        Ok(transformed) => {
            remember(
                &state,
                HistoryKind::Enhanced,
                quoted_title("Transformed", body.instruction.trim()),
                json!(transformed),
            );
            HttpResponse::Ok().json(ActionResponse::success(transformed))
        }
        Err(e) => {
            log_http_error!("Dataset transformation failed: {}", e);
            error_response(&e)
        }
    }
}

pub async fn suggest_chart(body: web::Json<DatasetBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    respond("Chart suggestion", service.suggest_chart(&body.dataset).await)
}

pub async fn insights(body: web::Json<DatasetBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    respond("Insights", service.insights(&body.dataset).await)
}

/// The answer text is the response data.
pub async fn query_dataset(body: web::Json<QueryBody>, state: web::Data<AppState>) -> impl Responder {
    let Some(service) = service(&state) else {
        return unavailable();
    };
    match service.query(&body.dataset, &body.query).await {
        Ok(answer) => {
            remember(
                &state,
                HistoryKind::Text,
                quoted_title("AI Query", body.query.trim()),
                json!(answer.answer),
            );
            HttpResponse::Ok().json(ActionResponse::success(answer.answer))
        }
        Err(e) => {
            log_http_error!("Dataset query failed: {}", e);
            error_response(&e)
        }
    }
}

/// Configuration summary without the API key itself
pub async fn get_status(state: web::Data<AppState>) -> impl Responder {
    let config = &state.config;
    HttpResponse::Ok().json(json!({
        "enabled": config.enabled,
        "configured": state.service.is_some(),
        "ready": config.is_ready(),
        "model": config.openrouter_model,
        "api_key": config.api_key_masked(),
        "batch_size": config.batch_size,
        "max_batch_attempts": config.max_batch_attempts,
        "default_row_count": config.default_row_count,
        "max_prompt_rows": config.max_prompt_rows,
        "max_structured_rows": config.max_structured_rows,
        "max_dataset_chars": config.max_dataset_chars,
        "history_items": state.history.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GatewayError;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            error_response(&GenerationError::invalid_input("bad")).status(),
            actix_web::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&GenerationError::configuration_error("no key")).status(),
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_response(&GenerationError::AllBatchesFailed {
                requested: 3,
                batches: 1
            })
            .status(),
            actix_web::http::StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(&GenerationError::Gateway(GatewayError::EmptyResponse)).status(),
            actix_web::http::StatusCode::BAD_GATEWAY
        );
    }
}
