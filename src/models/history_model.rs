//! models/history_model.rs
//! Registro histórico por remitente+asunto y resultados por destinatario.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::header_model::ParsedHeaders;

/// Estado final de un envío individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailStatus {
    Success,
    Failed,
}

/// Resultado inmutable de un envío a un destinatario concreto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailOutcome {
    pub to: String,
    pub status: MailStatus,
    /// RFC 3339, capturado al completarse el envío.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MailOutcome {
    pub fn success(to: impl Into<String>, response: String, message_id: String) -> Self {
        MailOutcome {
            to: to.into(),
            status: MailStatus::Success,
            timestamp: Utc::now().to_rfc3339(),
            response: Some(response),
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failure(to: impl Into<String>, error: String) -> Self {
        MailOutcome {
            to: to.into(),
            status: MailStatus::Failed,
            timestamp: Utc::now().to_rfc3339(),
            response: None,
            message_id: None,
            error: Some(error),
        }
    }
}

/// Registro persistido en el bucket, identificado por
/// `sha256(lowercase(from) + lowercase(title))`.
///
/// Los nombres de campo (incluido `successfullMails`) se conservan para no
/// invalidar los registros ya guardados en el bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryRecord {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_headers: Option<ParsedHeaders>,
    pub title: String,
    pub body: String,
    #[serde(rename = "successfullMails")]
    pub successful_mails: Vec<MailOutcome>,
    pub failed_mails: Vec<MailOutcome>,
}

impl HistoryRecord {
    /// Destinatarios que ya cuentan como procesados para este registro.
    ///
    /// Figurar en cualquiera de las dos listas marca como procesado; en un
    /// retry los fallidos quedan fuera del conjunto porque son justo los
    /// reenviables.
    pub fn processed_recipients(&self, is_retry: bool) -> HashSet<String> {
        let mut processed: HashSet<String> = self
            .successful_mails
            .iter()
            .map(|mail| mail.to.clone())
            .collect();

        if !is_retry {
            processed.extend(self.failed_mails.iter().map(|mail| mail.to.clone()));
        }

        processed
    }

    /// Mezcla los resultados de una pasada de despacho sobre las listas
    /// existentes.
    ///
    /// - Modo normal: anexa ambas listas sin deduplicar (el filtrado ocurre
    ///   antes de despachar).
    /// - Modo retry: anexa los éxitos y saca de la lista de fallidos a todo
    ///   destinatario que ahora aparezca entre ellos; los fallos nuevos no se
    ///   anexan.
    pub fn merge(
        &mut self,
        new_successes: Vec<MailOutcome>,
        new_failures: Vec<MailOutcome>,
        is_retry: bool,
    ) {
        if is_retry {
            let retried: HashSet<String> = new_successes
                .iter()
                .map(|mail| mail.to.clone())
                .collect();

            self.successful_mails.extend(new_successes);
            self.failed_mails.retain(|mail| !retried.contains(&mail.to));
        } else {
            self.successful_mails.extend(new_successes);
            self.failed_mails.extend(new_failures);
        }
    }
}
