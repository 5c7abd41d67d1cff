//! config/app_config.rs
//! Configuración del proceso, leída del entorno una sola vez al arrancar.

use anyhow::{bail, Context, Result};

/// Valores de entorno necesarios para levantar el relay.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Secreto compartido para el `Authorization: Bearer`.
    pub api_key: String,
    /// Puerto HTTP de escucha.
    pub port: u16,
    /// Endpoint S3 (R2) y credenciales del bucket.
    pub s3_endpoint: String,
    pub s3_access_key_id: String,
    pub s3_secret_access_key: String,
    pub bucket: String,
    /// Base pública para los enlaces de resultados.
    pub public_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = require("API_KEY")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let s3_endpoint = require("R2_S3_ENDPOINT")?;
        let s3_access_key_id = require("R2_S3_ACCESS_KEY_ID")?;
        let s3_secret_access_key = require("R2_S3_SECRET_ACCESS_KEY")?;
        let bucket = require("R2_BUCKET")?;

        // Sin base pública explícita, los enlaces apuntan directo al bucket.
        let public_base_url = std::env::var("R2_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", s3_endpoint.trim_end_matches('/'), bucket));

        Ok(AppConfig {
            api_key,
            port,
            s3_endpoint,
            s3_access_key_id,
            s3_secret_access_key,
            bucket,
            public_base_url,
        })
    }
}

fn require(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("Missing environment variable {}", name))?;

    if value.trim().is_empty() {
        bail!("Environment variable {} is empty", name);
    }

    Ok(value)
}
