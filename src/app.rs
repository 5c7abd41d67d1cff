//! app.rs
use actix_web::{error::InternalError, web, HttpResponse};
use serde_json::json;

use crate::handlers::mailer_handler;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        // Todas las respuestas de error son JSON, también las del extractor.
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({ "error": message })),
        )
        .into()
    }))
    .service(
        web::scope("/mailer").route("", web::post().to(mailer_handler::relay_mailer_endpoint)),
    );
}
