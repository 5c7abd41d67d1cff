//! services/dispatch_service.rs
//! Motor de despacho: un mensaje por destinatario, fan-out acotado vía SMTP.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use lettre::{
    message::{
        header::{ContentType, Header, HeaderName, HeaderValue},
        Mailbox, MessageBuilder, MultiPart, SinglePart,
    },
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::models::{
    header_model::ParsedHeaders,
    history_model::{MailOutcome, MailStatus},
    mailer_model::SendMailRequest,
};

/// Envíos simultáneos máximos por petición.
const MAX_CONCURRENT_SENDS: usize = 25;
/// Plazo por envío individual.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Selección de transporte según el puerto configurado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS desde el primer byte (puerto 465).
    Wrapper,
    /// Conexión en claro con upgrade STARTTLS oportunista.
    Opportunistic,
}

impl SmtpSecurity {
    pub fn for_port(port: u16) -> Self {
        if port == 465 {
            SmtpSecurity::Wrapper
        } else {
            SmtpSecurity::Opportunistic
        }
    }
}

// lettre aplica headers tipados; la familia List-* se cubre con un tipo por
// nombre, con el valor ya reconstruido en su forma de cabecera.
macro_rules! list_header {
    ($ty:ident, $name:literal) => {
        #[derive(Debug, Clone)]
        struct $ty(String);

        impl Header for $ty {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($name)
            }

            fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                Ok(Self(s.to_string()))
            }

            fn display(&self) -> HeaderValue {
                HeaderValue::new(Self::name(), self.0.clone())
            }
        }
    };
}

list_header!(ListArchive, "List-Archive");
list_header!(ListHelp, "List-Help");
list_header!(ListId, "List-Id");
list_header!(ListOwner, "List-Owner");
list_header!(ListPost, "List-Post");
list_header!(ListSubscribe, "List-Subscribe");
list_header!(ListUnsubscribe, "List-Unsubscribe");
list_header!(ListUnsubscribePost, "List-Unsubscribe-Post");

/// Resultados particionados de una pasada de despacho.
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub successful: Vec<MailOutcome>,
    pub failed: Vec<MailOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchService;

impl DispatchService {
    pub fn new() -> Self {
        DispatchService
    }

    /// Envía a todos los destinatarios, ya filtrados contra el histórico, y
    /// espera todos los resultados antes de devolver. Un fallo individual
    /// nunca aborta al resto de envíos.
    pub async fn send_all(
        &self,
        req: &SendMailRequest,
        headers: Option<&ParsedHeaders>,
        recipients: &[String],
    ) -> Result<DispatchSummary> {
        let mailer = Self::smtp_transport(req)?;
        let from: Mailbox = req.from.parse().context("Invalid from address")?;
        let reply_to: Option<Mailbox> = match &req.reply_to {
            Some(addr) => Some(addr.parse().context("Invalid reply_to address")?),
            None => None,
        };

        let outcomes: Vec<MailOutcome> = stream::iter(recipients)
            .map(|recipient| {
                let mailer = mailer.clone();
                let from = from.clone();
                let reply_to = reply_to.clone();
                async move {
                    Self::send_one(&mailer, &from, reply_to, req, headers, recipient).await
                }
            })
            .buffer_unordered(MAX_CONCURRENT_SENDS)
            .collect()
            .await;

        let (successful, failed): (Vec<_>, Vec<_>) = outcomes
            .into_iter()
            .partition(|outcome| outcome.status == MailStatus::Success);

        log::info!(
            "Despacho completado: {} enviados, {} fallidos",
            successful.len(),
            failed.len()
        );

        Ok(DispatchSummary { successful, failed })
    }

    async fn send_one(
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        from: &Mailbox,
        reply_to: Option<Mailbox>,
        req: &SendMailRequest,
        headers: Option<&ParsedHeaders>,
        recipient: &str,
    ) -> MailOutcome {
        let to: Mailbox = match recipient.parse() {
            Ok(to) => to,
            Err(e) => {
                return MailOutcome::failure(
                    recipient,
                    format!("Invalid recipient address: {}", e),
                )
            }
        };

        let message_id = format!("<{}@{}>", Uuid::new_v4(), req.smtp_server);
        let message = match Self::build_message(from, reply_to, to, req, headers, &message_id) {
            Ok(message) => message,
            Err(e) => {
                return MailOutcome::failure(recipient, format!("Failed to build message: {}", e))
            }
        };

        match tokio::time::timeout(SEND_TIMEOUT, mailer.send(message)).await {
            Ok(Ok(response)) => {
                let reply = response.message().collect::<Vec<_>>().join(" ");
                MailOutcome::success(
                    recipient,
                    format!("{} {}", response.code(), reply),
                    message_id,
                )
            }
            Ok(Err(e)) => MailOutcome::failure(recipient, e.to_string()),
            Err(_) => MailOutcome::failure(
                recipient,
                format!("SMTP send timed out after {}s", SEND_TIMEOUT.as_secs()),
            ),
        }
    }

    pub(crate) fn build_message(
        from: &Mailbox,
        reply_to: Option<Mailbox>,
        to: Mailbox,
        req: &SendMailRequest,
        headers: Option<&ParsedHeaders>,
        message_id: &str,
    ) -> Result<Message> {
        let mut builder = Message::builder()
            .from(from.clone())
            .to(to)
            .subject(&req.title)
            .message_id(Some(message_id.to_string()));

        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }

        if let Some(headers) = headers {
            for (key, entry) in headers {
                builder = apply_list_header(builder, key, entry.to_wire())?;
            }
        }

        // Texto y HTML llevan el mismo cuerpo.
        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(req.body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(req.body.clone()),
                ),
        )?;

        Ok(message)
    }

    /// Puerto 465: TLS desde el primer byte. Cualquier otro: conexión en
    /// claro con upgrade oportunista.
    fn smtp_transport(req: &SendMailRequest) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let tls_params = TlsParameters::new(req.smtp_server.clone())
            .context("Invalid TLS parameters for SMTP host")?;

        let builder = match SmtpSecurity::for_port(req.smtp_port) {
            SmtpSecurity::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&req.smtp_server)
                .context("Failed to create SMTP transport")?
                .tls(Tls::Wrapper(tls_params)),
            SmtpSecurity::Opportunistic => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&req.smtp_server)
                    .tls(Tls::Opportunistic(tls_params))
            }
        };

        Ok(builder
            .port(req.smtp_port)
            .credentials(Credentials::new(
                req.smtp_user.clone(),
                req.smtp_pass.clone(),
            ))
            .build())
    }
}

fn apply_list_header(builder: MessageBuilder, key: &str, value: String) -> Result<MessageBuilder> {
    let builder = match key {
        "archive" => builder.header(ListArchive(value)),
        "help" => builder.header(ListHelp(value)),
        "id" => builder.header(ListId(value)),
        "owner" => builder.header(ListOwner(value)),
        "post" => builder.header(ListPost(value)),
        "subscribe" => builder.header(ListSubscribe(value)),
        "unsubscribe" => builder.header(ListUnsubscribe(value)),
        "unsubscribe-post" => builder.header(ListUnsubscribePost(value)),
        other => anyhow::bail!("Unsupported email header: '{}'", other),
    };

    Ok(builder)
}
