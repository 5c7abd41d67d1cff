//! models/mailer_model.rs
//! Petición de envío masivo y cuerpos de respuesta del relay.

use std::collections::BTreeMap;

use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

/// Máximo de destinatarios por petición.
pub const MAX_RECIPIENTS: usize = 1000;
/// Longitud máxima del campo `reply_to`.
pub const MAX_REPLY_TO_LEN: usize = 128;
/// Tamaño máximo, serializado, del mapa `email_headers`.
pub const MAX_HEADERS_BYTES: usize = 512;

/// Cuerpo de POST /mailer. Los nombres de campo se mantienen tal cual los
/// esperan los clientes existentes.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMailRequest {
    pub from: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    pub to: Vec<String>,
    pub title: String,
    pub body: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    #[serde(default)]
    pub email_headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub is_retry: bool,
}

impl SendMailRequest {
    /// Validación campo a campo, antes de cualquier efecto secundario.
    /// Devuelve el primer error encontrado.
    pub fn validate(&self) -> Result<(), String> {
        if self.from.trim().is_empty() {
            return Err("The 'from' field is required and must be a non-empty string.".to_string());
        }
        if self.from.parse::<Mailbox>().is_err() {
            return Err("The 'from' field must be a valid email address.".to_string());
        }
        if let Some(reply_to) = &self.reply_to {
            if reply_to.len() > MAX_REPLY_TO_LEN {
                return Err("The 'reply_to' field must be at most 128 characters.".to_string());
            }
            if reply_to.parse::<Mailbox>().is_err() {
                return Err("The 'reply_to' field must be a valid email address.".to_string());
            }
        }
        if self.to.is_empty() || self.to.len() > MAX_RECIPIENTS {
            return Err(
                "The 'to' field must be an array with 1 to 1000 email addresses.".to_string(),
            );
        }
        if self.title.trim().is_empty() {
            return Err("The 'title' field is required and must be a non-empty string.".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("The 'body' field is required and must be a non-empty string.".to_string());
        }
        if self.smtp_server.trim().is_empty() {
            return Err(
                "The 'smtp_server' field is required and must be a non-empty string.".to_string(),
            );
        }
        if self.smtp_port == 0 {
            return Err(
                "The 'smtp_port' field is required and must be a positive number.".to_string(),
            );
        }
        if self.smtp_user.trim().is_empty() {
            return Err(
                "The 'smtp_user' field is required and must be a non-empty string.".to_string(),
            );
        }
        if self.smtp_pass.trim().is_empty() {
            return Err(
                "The 'smtp_pass' field is required and must be a non-empty string.".to_string(),
            );
        }
        if let Some(headers) = &self.email_headers {
            let serialized = serde_json::to_string(headers).map_err(|e| e.to_string())?;
            if serialized.len() > MAX_HEADERS_BYTES {
                return Err(
                    "The 'email_headers' field must serialize to at most 512 bytes.".to_string(),
                );
            }
        }

        Ok(())
    }
}

/// Respuesta 200 del relay, con los acumulados históricos del registro.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailerResponse {
    pub total_success: usize,
    pub total_failed: usize,
    pub all_time_total_success: usize,
    pub all_time_total_failed: usize,
    pub all_time_result_link: String,
}
