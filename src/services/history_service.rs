//! services/history_service.rs
//! Registro histórico de envíos por remitente+asunto, persistido en el bucket.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::app_config::AppConfig;
use crate::models::header_model::ParsedHeaders;
use crate::models::history_model::{HistoryRecord, MailOutcome};

/// Prefijo de los objetos dentro del bucket.
const OBJECT_PREFIX: &str = "web-mailer";

/// Resultado de `reconcile`: enlace público y listas ya mezcladas.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub link: String,
    pub successful_mails: Vec<MailOutcome>,
    pub failed_mails: Vec<MailOutcome>,
}

#[derive(Clone)]
pub struct HistoryService {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
    // Serializa el read-modify-write por hash dentro del proceso. Escritores
    // en otros procesos siguen compitiendo: el último PUT gana.
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl HistoryService {
    pub fn new(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            config.s3_access_key_id.clone(),
            config.s3_secret_access_key.clone(),
            None,
            None,
            "web-mailer",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .region(Region::new("auto"))
            .endpoint_url(config.s3_endpoint.as_str())
            .credentials_provider(credentials)
            .build();

        HistoryService {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Hash determinista de remitente+asunto, ambos en minúsculas. Cuerpo,
    /// headers y destinatarios no participan: la misma pareja resuelve
    /// siempre al mismo registro.
    pub fn record_hash(from: &str, title: &str) -> String {
        let digest = Sha256::digest(format!(
            "{}{}",
            from.to_lowercase(),
            title.to_lowercase()
        ));
        digest.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    /// Recupera el registro para remitente+asunto. Si el objeto no existe
    /// devuelve un registro vacío en lugar de fallar; cualquier otro error
    /// del bucket sí se propaga.
    pub async fn fetch(&self, from: &str, title: &str) -> Result<HistoryRecord> {
        let hash = Self::record_hash(from, title);
        self.fetch_by_hash(&hash).await
    }

    /// Read-modify-write del registro: pisa los campos descriptivos con los
    /// valores de esta llamada, mezcla las listas de resultados y escribe el
    /// objeto de vuelta bajo la misma clave.
    #[allow(clippy::too_many_arguments)]
    pub async fn reconcile(
        &self,
        from: &str,
        title: &str,
        body: &str,
        reply_to: Option<&str>,
        email_headers: Option<&ParsedHeaders>,
        new_successes: Vec<MailOutcome>,
        new_failures: Vec<MailOutcome>,
        is_retry: bool,
    ) -> Result<ReconcileOutcome> {
        let hash = Self::record_hash(from, title);

        let guard = self.lock_for(&hash).await;
        let _held = guard.lock().await;

        let mut record = self.fetch_by_hash(&hash).await?;

        record.from = from.to_string();
        record.reply_to = reply_to.map(str::to_string);
        record.email_headers = email_headers.cloned();
        record.title = title.to_string();
        record.body = body.to_string();
        record.merge(new_successes, new_failures, is_retry);

        self.put_record(&hash, &record).await?;

        Ok(ReconcileOutcome {
            link: self.result_link(&hash),
            successful_mails: record.successful_mails,
            failed_mails: record.failed_mails,
        })
    }

    async fn fetch_by_hash(&self, hash: &str) -> Result<HistoryRecord> {
        let key = Self::object_key(hash);

        let object = match self
            .client
            .get_object()
            .bucket(self.bucket.as_str())
            .key(key.as_str())
            .send()
            .await
        {
            Ok(object) => object,
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false) =>
            {
                return Ok(HistoryRecord::default());
            }
            Err(err) => {
                return Err(anyhow::Error::new(err))
                    .with_context(|| format!("Error fetching history object '{}'", key));
            }
        };

        let bytes = object
            .body
            .collect()
            .await
            .with_context(|| format!("Error reading history object '{}'", key))?
            .into_bytes();

        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("Malformed history record at '{}'", key))?;

        Ok(record)
    }

    async fn put_record(&self, hash: &str, record: &HistoryRecord) -> Result<()> {
        let key = Self::object_key(hash);
        let payload = serde_json::to_vec(record).context("Error serializing history record")?;

        self.client
            .put_object()
            .bucket(self.bucket.as_str())
            .key(key.as_str())
            .content_type("application/json")
            .body(ByteStream::from(payload))
            .send()
            .await
            .with_context(|| format!("Error updating history object '{}'", key))?;

        Ok(())
    }

    fn object_key(hash: &str) -> String {
        format!("{}/{}.json", OBJECT_PREFIX, hash)
    }

    /// Enlace público al registro, con marca de tiempo como cache-buster.
    fn result_link(&self, hash: &str) -> String {
        format!(
            "{}/{}/{}.json?t={}",
            self.public_base_url,
            OBJECT_PREFIX,
            hash,
            Utc::now().timestamp_millis()
        )
    }

    async fn lock_for(&self, hash: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(hash.to_string()).or_default().clone()
    }
}
