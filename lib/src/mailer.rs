//! Mail dispatch over SMTP.
//!
//! A [`Mailer`] validates configuration and hands out a [`Transport`]; the
//! transport turns a [`MailMessage`] into a MIME message and sends it.
//! Nothing here retries: a failed send is reported to the caller as is.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::header::{self, ContentType};
use lettre::message::{Attachment as MimeAttachment, Mailbox, Mailboxes, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::email::{MailMessage, DEFAULT_CONTENT_TYPE};
use crate::error::Error;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the message and returns its Message-ID
    async fn send(&self, message: MailMessage) -> Result<String, Error>;
}

pub trait Mailer: Send + Sync + 'static {
    /// Builds a transport, failing with `ConfigMissing` when the SMTP
    /// settings are incomplete.
    fn transport(&self) -> Result<Box<dyn Transport>, Error>;
}

/// Mailer backed by a real SMTP server
#[derive(Clone, Debug)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl Mailer for SmtpMailer {
    fn transport(&self) -> Result<Box<dyn Transport>, Error> {
        Ok(Box::new(build_transport(&self.config)?))
    }
}

pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

/// Builds an SMTP transport.
///
/// `secure` selects implicit TLS. Otherwise the connection starts in plain
/// text and upgrades with STARTTLS when the server offers it.
pub fn build_transport(config: &SmtpConfig) -> Result<SmtpTransport, Error> {
    let creds = config.credentials()?;

    let builder = if creds.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&creds.host)
            .map_err(|e| Error::Config(e.to_string()))?
    } else {
        let tls = TlsParameters::new(creds.host.clone()).map_err(|e| Error::Config(e.to_string()))?;
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&creds.host)
            .tls(Tls::Opportunistic(tls))
    };

    let inner = builder
        .port(creds.port)
        .credentials(Credentials::new(creds.username, creds.password))
        .build();

    Ok(SmtpTransport { inner })
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, message: MailMessage) -> Result<String, Error> {
        let (message, message_id) = build_message(message)?;

        let response = self.inner.send(message).await?;
        log::debug!("SMTP server replied {}", response.code());

        Ok(message_id)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, Error> {
    address
        .parse()
        .map_err(|_| Error::InvalidAddress(address.to_string()))
}

/// Parses a comma-separated recipient list such as `a@x.com, b@x.com`
fn parse_mailboxes(addresses: &str) -> Result<Mailboxes, Error> {
    let mailboxes: Mailboxes = addresses
        .parse()
        .map_err(|_| Error::InvalidAddress(addresses.to_string()))?;

    if mailboxes.iter().next().is_none() {
        return Err(Error::InvalidAddress(addresses.to_string()));
    }

    Ok(mailboxes)
}

fn content_type(value: &str) -> Result<ContentType, Error> {
    ContentType::parse(value)
        .or_else(|_| ContentType::parse(DEFAULT_CONTENT_TYPE))
        .map_err(|e| Error::Build(e.to_string()))
}

/// Converts a `MailMessage` into a `multipart/mixed` MIME message: the HTML
/// body first, then one part per attachment in order.
///
/// Returns the message together with its generated Message-ID.
pub fn build_message(message: MailMessage) -> Result<(Message, String), Error> {
    let from = parse_mailbox(&message.from)?;
    let to = parse_mailboxes(&message.to)?;
    let message_id = format!("<{}@{}>", Uuid::new_v4(), from.email.domain());

    let mut body = MultiPart::mixed().singlepart(SinglePart::html(message.html));
    for attachment in message.attachments {
        let part = MimeAttachment::new(attachment.filename)
            .body(attachment.content.to_vec(), content_type(&attachment.content_type)?);
        body = body.singlepart(part);
    }

    let mime = Message::builder()
        .from(from)
        .mailbox(header::To::from(to))
        .subject(message.subject)
        .message_id(Some(message_id.clone()))
        .multipart(body)?;

    Ok((mime, message_id))
}

/// In-memory mailer for development and testing.
///
/// Messages are built exactly as for SMTP, then stored instead of sent.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    failure: Option<Error>,
    send_failure: Option<Error>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose `transport` always fails with `err`
    pub fn failing(err: Error) -> Self {
        Self {
            failure: Some(err),
            ..Default::default()
        }
    }

    /// A mailer whose transport builds fine but fails every `send` with
    /// `err`, as an unreachable SMTP server would
    pub fn rejecting(err: Error) -> Self {
        Self {
            send_failure: Some(err),
            ..Default::default()
        }
    }

    /// Messages accepted so far, in send order
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Mailer for MemoryMailer {
    fn transport(&self) -> Result<Box<dyn Transport>, Error> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Box::new(MemoryTransport {
                sent: self.sent.clone(),
                failure: self.send_failure.clone(),
            })),
        }
    }
}

struct MemoryTransport {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    failure: Option<Error>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, message: MailMessage) -> Result<String, Error> {
        let (_, message_id) = build_message(message.clone())?;
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(message);
        Ok(message_id)
    }
}
