//! HTTP route handlers for the history API

use crate::generation::ActionResponse;
use crate::http_server::AppState;
use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde_json::{json, Value};
use uuid::Uuid;

const LOG_TARGET: &str = "synthetix::history";

fn storage_failure(e: impl std::fmt::Display) -> HttpResponse {
    error!(target: LOG_TARGET, "History access failed: {}", e);
    HttpResponse::InternalServerError().json(ActionResponse::<Value>::failure(
        "Failed to access the generation history.",
    ))
}

fn parse_id(raw: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(ActionResponse::<Value>::failure(format!(
            "Invalid history id: {}",
            raw
        )))
    })
}

pub async fn list_history(state: web::Data<AppState>) -> impl Responder {
    match state.history.list() {
        Ok(items) => HttpResponse::Ok().json(ActionResponse::success(items)),
        Err(e) => storage_failure(e),
    }
}

pub async fn get_history_item(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.history.get(&id) {
        Ok(Some(item)) => HttpResponse::Ok().json(ActionResponse::success(item)),
        Ok(None) => HttpResponse::NotFound().json(ActionResponse::<Value>::failure(format!(
            "History item {} not found",
            id
        ))),
        Err(e) => storage_failure(e),
    }
}

pub async fn delete_history_item(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.history.remove(&id) {
        Ok(true) => HttpResponse::Ok().json(ActionResponse::success(json!({"deleted": id}))),
        Ok(false) => HttpResponse::NotFound().json(ActionResponse::<Value>::failure(format!(
            "History item {} not found",
            id
        ))),
        Err(e) => storage_failure(e),
    }
}

pub async fn clear_history(state: web::Data<AppState>) -> impl Responder {
    match state.history.clear() {
        Ok(()) => HttpResponse::Ok().json(ActionResponse::success(json!({"cleared": true}))),
        Err(e) => storage_failure(e),
    }
}
