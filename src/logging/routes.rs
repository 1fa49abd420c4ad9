//! HTTP route handlers for log inspection

use crate::logging::LoggingSystem;
use actix_web::{web, HttpResponse, Responder};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;

#[derive(Serialize, Deserialize)]
pub struct LogLevelUpdate {
    pub feature: String,
    pub level: String,
}

/// Recent log lines, oldest first
pub async fn list_logs() -> impl Responder {
    HttpResponse::Ok().json(crate::logging::get_logs())
}

/// Stream log lines as Server-Sent Events
pub async fn stream_logs() -> impl Responder {
    match crate::logging::subscribe() {
        Some(rx) => {
            let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
                match msg {
                    Ok(line) => Some(Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(
                        format!("data: {}\n\n", line),
                    ))),
                    Err(_) => None,
                }
            });
            HttpResponse::Ok()
                .insert_header(("Content-Type", "text/event-stream"))
                .streaming(stream)
        }
        None => HttpResponse::ServiceUnavailable()
            .json(serde_json::json!({"error": "Log streaming not available"})),
    }
}

pub async fn get_config() -> impl Responder {
    match LoggingSystem::get_config().await {
        Some(config) => HttpResponse::Ok().json(serde_json::json!({ "config": config })),
        None => HttpResponse::Ok().json(serde_json::json!({
            "message": "Basic logging configuration",
            "current_level": log::max_level().to_string(),
        })),
    }
}

pub async fn update_feature_level(level_update: web::Json<LogLevelUpdate>) -> impl Responder {
    match LoggingSystem::update_feature_level(&level_update.feature, &level_update.level).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": format!("Updated {} log level to {}", level_update.feature, level_update.level)
        })),
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Failed to update log level: {}", e)
        })),
    }
}
