//! tests/history_tests.rs
//! Pruebas del registro histórico: hash, filtrado y mezcla de resultados.

#[cfg(test)]
mod tests {
    use crate::models::history_model::{HistoryRecord, MailOutcome, MailStatus};
    use crate::services::history_service::HistoryService;

    fn success(to: &str) -> MailOutcome {
        MailOutcome::success(to, "250 Ok".to_string(), format!("<{}>", to))
    }

    fn failure(to: &str) -> MailOutcome {
        MailOutcome::failure(to, "connection refused".to_string())
    }

    #[test]
    fn test_hash_determinista_e_insensible_a_mayusculas() {
        let a = HistoryService::record_hash("User@Example.com", "Hola Mundo");
        let b = HistoryService::record_hash("user@example.COM", "HOLA mundo");

        assert_eq!(a, b);
        assert_ne!(
            a,
            HistoryService::record_hash("user@example.com", "otro asunto")
        );
    }

    #[test]
    fn test_hash_vector_conocido() {
        // sha256("hello")
        assert_eq!(
            HistoryService::record_hash("HELLO", ""),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_resultados_inmutables() {
        let ok = MailOutcome::success("a@b.com", "250 Ok".to_string(), "<id@host>".to_string());
        assert_eq!(ok.status, MailStatus::Success);
        assert!(ok.response.is_some());
        assert!(ok.message_id.is_some());
        assert!(ok.error.is_none());
        assert!(!ok.timestamp.is_empty());

        let bad = MailOutcome::failure("a@b.com", "boom".to_string());
        assert_eq!(bad.status, MailStatus::Failed);
        assert!(bad.error.is_some());
        assert!(bad.response.is_none());
        assert!(bad.message_id.is_none());
    }

    #[test]
    fn test_filtrado_por_presencia_no_por_estado() {
        let mut record = HistoryRecord::default();
        record.merge(vec![success("ok@y.com")], vec![failure("bad@y.com")], false);

        let processed = record.processed_recipients(false);
        assert!(processed.contains("ok@y.com"));
        assert!(processed.contains("bad@y.com"));

        // En retry los fallidos vuelven a ser elegibles.
        let processed_retry = record.processed_recipients(true);
        assert!(processed_retry.contains("ok@y.com"));
        assert!(!processed_retry.contains("bad@y.com"));
    }

    #[test]
    fn test_append_sin_deduplicar() {
        let mut record = HistoryRecord::default();
        record.merge(vec![success("x@y.com")], vec![], false);
        record.merge(vec![success("x@y.com")], vec![failure("z@y.com")], false);

        assert_eq!(record.successful_mails.len(), 2);
        assert_eq!(record.failed_mails.len(), 1);
    }

    #[test]
    fn test_retry_saca_al_reenviado_de_los_fallidos() {
        let mut record = HistoryRecord::default();
        record.merge(
            vec![],
            vec![failure("x@y.com"), failure("otro@y.com")],
            false,
        );

        record.merge(vec![success("x@y.com")], vec![], true);

        assert!(record.failed_mails.iter().all(|mail| mail.to != "x@y.com"));
        assert!(record
            .failed_mails
            .iter()
            .any(|mail| mail.to == "otro@y.com"));
        assert!(record
            .successful_mails
            .iter()
            .any(|mail| mail.to == "x@y.com"));
    }

    #[test]
    fn test_retry_descarta_fallos_nuevos() {
        // En retry solo se filtra la lista de fallidos ya registrada.
        let mut record = HistoryRecord::default();
        record.merge(vec![], vec![failure("nuevo@y.com")], true);

        assert!(record.failed_mails.is_empty());
    }

    #[test]
    fn test_json_compatible_con_registros_guardados() {
        let mut record = HistoryRecord {
            from: "a@b.com".to_string(),
            reply_to: Some("r@b.com".to_string()),
            title: "asunto".to_string(),
            body: "cuerpo".to_string(),
            ..HistoryRecord::default()
        };
        record.merge(vec![success("x@y.com")], vec![failure("z@y.com")], false);

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("successfullMails").is_some());
        assert!(value.get("failedMails").is_some());
        assert!(value.get("replyTo").is_some());

        let sent = &value["successfullMails"][0];
        assert_eq!(sent["status"], "success");
        assert!(sent.get("messageId").is_some());
        assert!(sent.get("error").is_none());

        let lost = &value["failedMails"][0];
        assert_eq!(lost["status"], "failed");
        assert!(lost.get("error").is_some());
    }

    #[test]
    fn test_objeto_vacio_deserializa_a_registro_vacio() {
        let record: HistoryRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, HistoryRecord::default());
    }
}
