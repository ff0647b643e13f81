use anyhow::{anyhow, Context, Result};
use lettre::message::{header::ContentType, Attachment as MailAttachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Notifier, OutboundMessage};

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} missing"))
}

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    /// Used when a message has no recipient of its own.
    default_to: Option<Mailbox>,
}

impl EmailSender {
    pub fn from_env() -> Result<Self> {
        let host = required("SMTP_HOST")?;
        let user = required("SMTP_USER")?;
        let pass = required("SMTP_PASS")?;
        let from_addr = required("NOTIFY_EMAIL_FROM")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let default_to = match std::env::var("NOTIFY_EMAIL_TO") {
            Ok(s) if !s.trim().is_empty() => Some(s.parse().context("invalid NOTIFY_EMAIL_TO")?),
            _ => None,
        };

        Ok(Self {
            mailer,
            from,
            default_to,
        })
    }

    fn build(&self, msg: &OutboundMessage) -> Result<Message> {
        let to: Mailbox = if msg.recipient.trim().is_empty() {
            self.default_to
                .clone()
                .ok_or_else(|| anyhow!("no recipient and NOTIFY_EMAIL_TO unset"))?
        } else {
            msg.recipient.parse().context("invalid recipient")?
        };

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(msg.subject.clone());

        let text = SinglePart::plain(msg.body.clone());
        let email = match &msg.attachment {
            Some(att) => builder.multipart(
                MultiPart::mixed().singlepart(text).singlepart(
                    MailAttachment::new(att.filename.clone())
                        .body(att.content.clone(), ContentType::TEXT_PLAIN),
                ),
            ),
            None => builder.singlepart(text),
        };
        email.context("build email")
    }
}

#[async_trait::async_trait]
impl Notifier for EmailSender {
    async fn send(&self, msg: &OutboundMessage) -> Result<bool> {
        let email = self.build(msg)?;
        let response = self.mailer.send(email).await.context("send email")?;
        Ok(response.is_positive())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
