//! HTTP surface: the streaming chat endpoint, the standalone translation
//! endpoint and a health probe.

pub mod handlers;
pub mod models;
pub mod routes;

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::info;

use crate::chat::TurnPipeline;
use crate::error::Result;
use crate::translate::TranslationService;

/// Shared state handed to every handler.
pub struct AppState {
    pub pipeline: Arc<TurnPipeline>,
    pub translator: Arc<dyn TranslationService>,
}

pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
    let data = web::Data::new(state);

    info!("Starting server at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
