//! tests/header_tests.rs
//! Pruebas del normalizador de list-headers.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::models::header_model::{HeaderEntry, HeaderSegment};
    use crate::services::header_service::parse_list_headers;

    fn raw(key: &str, value: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(key.to_string(), value.to_string());
        headers
    }

    #[test]
    fn test_unsubscribe_multivalor() {
        let parsed = parse_list_headers(&raw(
            "List-Unsubscribe",
            "<mailto:a@b.com> (click here), <http://x.com/y>",
        ))
        .expect("el valor multivalor debería parsear");

        let entry = parsed.get("unsubscribe").expect("clave normalizada");
        assert_eq!(
            entry,
            &HeaderEntry::Many(vec![
                HeaderSegment::Annotated {
                    url: "a@b.com".to_string(),
                    comment: "click here".to_string(),
                },
                HeaderSegment::Plain("http://x.com/y".to_string()),
            ])
        );
    }

    #[test]
    fn test_forma_json_canonica() {
        let parsed = parse_list_headers(&raw(
            "List-Unsubscribe",
            "<mailto:a@b.com> (click here), <http://x.com/y>",
        ))
        .unwrap();

        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({
                "unsubscribe": [
                    { "url": "a@b.com", "comment": "click here" },
                    "http://x.com/y"
                ]
            })
        );
    }

    #[test]
    fn test_clave_sin_prefijo_tambien_normaliza() {
        let parsed = parse_list_headers(&raw("UNSUBSCRIBE", "<https://x.com/baja>")).unwrap();

        assert_eq!(
            parsed.get("unsubscribe"),
            Some(&HeaderEntry::One(HeaderSegment::Plain(
                "https://x.com/baja".to_string()
            )))
        );
    }

    #[test]
    fn test_valor_escalar_sin_brackets() {
        let parsed = parse_list_headers(&raw("List-Post", "NO")).unwrap();

        assert_eq!(
            parsed.get("post"),
            Some(&HeaderEntry::One(HeaderSegment::Plain("NO".to_string())))
        );
    }

    #[test]
    fn test_header_desconocido_rechazado() {
        assert!(parse_list_headers(&raw("X-Custom", "valor")).is_err());
    }

    #[test]
    fn test_salto_de_linea_rechazado() {
        assert!(parse_list_headers(&raw(
            "List-Unsubscribe",
            "<https://x.com/y>\r\nBcc: intruso@mal.com"
        ))
        .is_err());
    }

    #[test]
    fn test_valor_vacio_rechazado() {
        assert!(parse_list_headers(&raw("List-Unsubscribe", "   ")).is_err());
    }

    #[test]
    fn test_reconstruccion_para_el_transporte() {
        let parsed = parse_list_headers(&raw(
            "List-Unsubscribe",
            "<mailto:a@b.com> (click here), <http://x.com/y>",
        ))
        .unwrap();

        assert_eq!(
            parsed["unsubscribe"].to_wire(),
            "<mailto:a@b.com> (click here), <http://x.com/y>"
        );

        let post = parse_list_headers(&raw("List-Post", "NO")).unwrap();
        assert_eq!(post["post"].to_wire(), "NO");
    }
}
