use actix_web::http::Method;
use actix_web::web;
use crate::web::handlers;

// Same ceiling as the gateway's synchronous payload limit
pub const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/chat")
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .route(web::post().to(handlers::chat))
            .route(web::method(Method::OPTIONS).to(handlers::preflight)),
    )
    .route("/health", web::get().to(handlers::health_check));
}
