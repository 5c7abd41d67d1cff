//! models/header_model.rs
//! Representación canónica de los list-headers ya normalizados.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mapa normalizado: clave en minúsculas y sin el prefijo `list-`.
pub type ParsedHeaders = BTreeMap<String, HeaderEntry>;

/// Valor de un header: escalar, o secuencia ordenada si venía separado por comas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderEntry {
    Many(Vec<HeaderSegment>),
    One(HeaderSegment),
}

/// Un segmento individual del valor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderSegment {
    /// URL extraída de `<...>` acompañada de un comentario `(...)`.
    Annotated { url: String, comment: String },
    /// URL extraída de `<...>`, o el texto original recortado.
    Plain(String),
}

impl HeaderEntry {
    /// Reconstruye el valor en su forma de cabecera RFC, lista para el transporte.
    pub fn to_wire(&self) -> String {
        match self {
            HeaderEntry::Many(segments) => segments
                .iter()
                .map(HeaderSegment::to_wire)
                .collect::<Vec<_>>()
                .join(", "),
            HeaderEntry::One(segment) => segment.to_wire(),
        }
    }
}

impl HeaderSegment {
    pub fn to_wire(&self) -> String {
        match self {
            HeaderSegment::Annotated { url, comment } => {
                format!("{} ({})", angle_bracket(url), comment)
            }
            HeaderSegment::Plain(value) => angle_bracket(value),
        }
    }
}

/// Las URLs van entre `<...>` (RFC 2369); las direcciones recuperan su
/// esquema `mailto:`. Valores literales tipo `NO` quedan tal cual.
fn angle_bracket(value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        format!("<{}>", value)
    } else if value.contains('@') && !value.contains(char::is_whitespace) {
        format!("<mailto:{}>", value)
    } else {
        value.to_string()
    }
}
