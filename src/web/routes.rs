use actix_web::web;

use super::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/chat", web::post().to(handlers::chat))
            .route("/translate", web::post().to(handlers::translate)),
    )
    .route("/health", web::get().to(handlers::health));
}
