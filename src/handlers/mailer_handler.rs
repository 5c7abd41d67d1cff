//! handlers/mailer_handler.rs
//! Endpoint del relay: autentica, valida, filtra contra el histórico,
//! despacha y persiste los resultados.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::{
    config::app_config::AppConfig,
    models::mailer_model::{MailerResponse, SendMailRequest},
    services::{
        dispatch_service::DispatchService, header_service, history_service::HistoryService,
    },
};

/// POST /mailer
pub async fn relay_mailer_endpoint(
    http_req: HttpRequest,
    config: web::Data<AppConfig>,
    history_service: web::Data<HistoryService>,
    dispatch_service: web::Data<DispatchService>,
    body: web::Json<SendMailRequest>,
) -> HttpResponse {
    if let Err(response) = check_bearer_token(&http_req, &config) {
        return response;
    }

    let req = body.into_inner();

    // Nunca loggear credenciales SMTP.
    log::info!(
        "Petición de relay: {} destinatarios, asunto '{}', retry={}",
        req.to.len(),
        req.title,
        req.is_retry
    );

    if let Err(message) = req.validate() {
        return HttpResponse::BadRequest().json(json!({ "error": message }));
    }

    let parsed_headers = match &req.email_headers {
        Some(raw) => match header_service::parse_list_headers(raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
            }
        },
        None => None,
    };

    // Quien ya figura en el registro no se reenvía.
    let record = match history_service.fetch(&req.from, &req.title).await {
        Ok(record) => record,
        Err(e) => {
            log::error!("Fallo leyendo el histórico: {:?}", e);
            return internal_error(&e);
        }
    };

    let processed = record.processed_recipients(req.is_retry);
    let recipients: Vec<String> = req
        .to
        .iter()
        .filter(|to| !processed.contains(*to))
        .cloned()
        .collect();

    if recipients.is_empty() {
        log::info!("Todos los destinatarios ya estaban procesados; se omite el envío");
        return HttpResponse::Ok().json(json!({ "skipped": true }));
    }

    let summary = match dispatch_service
        .send_all(&req, parsed_headers.as_ref(), &recipients)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("Fallo de despacho: {:?}", e);
            return internal_error(&e);
        }
    };

    let total_success = summary.successful.len();
    let total_failed = summary.failed.len();

    let merged = match history_service
        .reconcile(
            &req.from,
            &req.title,
            &req.body,
            req.reply_to.as_deref(),
            parsed_headers.as_ref(),
            summary.successful,
            summary.failed,
            req.is_retry,
        )
        .await
    {
        Ok(merged) => merged,
        Err(e) => {
            // Los resultados ya computados se pierden si falla la escritura
            // final: persistencia at-most-once.
            log::error!("Fallo persistiendo el histórico: {:?}", e);
            return internal_error(&e);
        }
    };

    HttpResponse::Ok().json(MailerResponse {
        total_success,
        total_failed,
        all_time_total_success: merged.successful_mails.len(),
        all_time_total_failed: merged.failed_mails.len(),
        all_time_result_link: merged.link,
    })
}

/// 401 sin cabecera de autorización, 403 con token inválido.
fn check_bearer_token(req: &HttpRequest, config: &AppConfig) -> Result<(), HttpResponse> {
    let header = match req.headers().get(actix_web::http::header::AUTHORIZATION) {
        Some(header) => header,
        None => {
            return Err(HttpResponse::Unauthorized()
                .json(json!({ "error": "Authorization header is missing" })));
        }
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.split(' ').nth(1));

    match token {
        Some(token) if token == config.api_key => Ok(()),
        _ => Err(HttpResponse::Forbidden().json(json!({ "error": "Invalid or missing token" }))),
    }
}

fn internal_error(e: &anyhow::Error) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": e.to_string()
    }))
}
