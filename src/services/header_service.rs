//! services/header_service.rs
//! Normaliza el mapa crudo de list-headers a su representación canónica.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::header_model::{HeaderEntry, HeaderSegment, ParsedHeaders};

/// Familia de list-headers (RFC 4021) que el transporte sabe aplicar.
const SUPPORTED_HEADERS: &[&str] = &[
    "archive",
    "help",
    "id",
    "owner",
    "post",
    "subscribe",
    "unsubscribe",
    "unsubscribe-post",
];

lazy_static! {
    static ref MAILTO_RE: Regex = Regex::new(r"<mailto:(.+?)>").unwrap();
    static ref HTTP_RE: Regex = Regex::new(r"<(https?://.+?)>").unwrap();
    static ref COMMENT_RE: Regex = Regex::new(r"\((.+?)\)").unwrap();
}

/// Convierte el mapa crudo en su forma canónica.
///
/// Cualquier error invalida la petición completa (400); nunca se devuelve un
/// resultado parcial.
pub fn parse_list_headers(headers: &BTreeMap<String, String>) -> Result<ParsedHeaders> {
    let mut parsed = ParsedHeaders::new();

    for (key, value) in headers {
        // Minúsculas y sin la primera aparición de `list-`.
        let normalized_key = key.to_lowercase().replacen("list-", "", 1);

        if !SUPPORTED_HEADERS.contains(&normalized_key.as_str()) {
            bail!("Unsupported email header: '{}'", key);
        }
        if value.contains('\r') || value.contains('\n') {
            bail!("The header '{}' contains line breaks", key);
        }
        if value.trim().is_empty() {
            bail!("The header '{}' has an empty value", key);
        }

        let entry = if value.contains(',') {
            HeaderEntry::Many(value.split(',').map(parse_header_value).collect())
        } else {
            HeaderEntry::One(parse_header_value(value))
        };

        parsed.insert(normalized_key, entry);
    }

    Ok(parsed)
}

/// Un segmento individual: extrae `<mailto:...>` o `<http(s)://...>` y, si lo
/// acompaña, el comentario `(...)`.
fn parse_header_value(value: &str) -> HeaderSegment {
    let mut extracted = value.trim().to_string();

    if let Some(caps) = MAILTO_RE.captures(value) {
        extracted = caps[1].to_string();
    } else if let Some(caps) = HTTP_RE.captures(value) {
        extracted = caps[1].to_string();
    }

    if let Some(caps) = COMMENT_RE.captures(value) {
        return HeaderSegment::Annotated {
            url: extracted,
            comment: caps[1].to_string(),
        };
    }

    HeaderSegment::Plain(extracted)
}
