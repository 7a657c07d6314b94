use actix_web::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;
use uuid::Uuid;

use crate::web::error::ChatError;
use crate::web::models::{ChatRequest, ChatResponse};
use crate::AppState;

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// CORS preflight; the headers themselves come from the DefaultHeaders middleware
pub async fn preflight() -> impl Responder {
    HttpResponse::Ok().finish()
}

// Chat API endpoint
pub async fn chat(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ChatError> {
    let request_id = correlation_id(&req);
    let chat = ChatRequest::parse(&body)?;

    info!(
        "Chat request {}: {} characters, {} history turns",
        request_id,
        chat.message.len(),
        chat.history.len()
    );

    let prompt = data.model.build_request(chat.history, &chat.message);

    let completion = data.model.generate_response(&prompt).await.map_err(|e| {
        error!("Bedrock API error for request {}: {} - {}", request_id, e.code(), e);
        ChatError::from(e)
    })?;

    Ok(HttpResponse::Ok()
        .insert_header((CACHE_CONTROL, "no-cache, no-store, must-revalidate"))
        .insert_header((PRAGMA, "no-cache"))
        .insert_header((EXPIRES, "0"))
        .json(ChatResponse {
            response: completion.text,
            model_used: data.model.model_label().to_string(),
            timestamp: request_id,
            tokens_used: completion.output_tokens,
        }))
}

fn correlation_id(req: &HttpRequest) -> String {
    req.headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
