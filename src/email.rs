//! Outgoing account emails (activation and password reset).
//!
//! Delivery goes through the [`Mailer`] trait. Production uses SMTP via
//! `lettre` when `SMTP_HOST` is configured and otherwise logs the message.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("email build error: {0}")]
    Build(String),
    #[error("email rejected: {0}")]
    Rejected(String),
}

/// A fully rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers rendered messages.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>>;
}

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "My App <info@my-app.com>";

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl SmtpConfig {
    /// Load SMTP settings from the environment.
    ///
    /// Returns `None` when `SMTP_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    async fn deliver(&self, mail: OutgoingMail) -> Result<(), MailError> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        let message = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(mail.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mut transport =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport = transport.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport.build().send(message).await?;
        info!(to = %mail.to, "Email sent");
        Ok(())
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(self.deliver(mail))
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            info!(to = %mail.to, subject = %mail.subject, body = %mail.html, "Email not sent (no SMTP configured)");
            Ok(())
        })
    }
}

/// Pick the SMTP mailer when configured, the log mailer otherwise.
pub fn mailer_from_env() -> Arc<dyn Mailer> {
    match SmtpConfig::from_env() {
        Some(config) => {
            info!(host = %config.smtp_host, port = config.smtp_port, "Using SMTP mailer");
            Arc::new(SmtpMailer::new(config))
        }
        None => {
            info!("SMTP_HOST not set, emails will be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Renders account emails and hands them to a [`Mailer`].
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    client_origin: String,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, client_origin: impl Into<String>) -> Self {
        let client_origin = client_origin.into().trim_end_matches('/').to_string();
        Self {
            mailer,
            client_origin,
        }
    }

    pub async fn send_account_activation(&self, email: &str, token: &str) -> Result<(), MailError> {
        let link = format!("{}/#/login?token={}", self.client_origin, token);
        self.mailer
            .send(OutgoingMail {
                to: email.to_string(),
                subject: "Account Activation".to_string(),
                html: format!(
                    "<div><b>Please click below link to activate your account</b></div>\
                     <div><a href=\"{link}\">Activate</a></div>"
                ),
            })
            .await
    }

    pub async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailError> {
        let link = format!("{}/#/password-reset?reset={}", self.client_origin, token);
        self.mailer
            .send(OutgoingMail {
                to: email.to_string(),
                subject: "Password Reset".to_string(),
                html: format!(
                    "<div><b>Please click below link to reset your password</b></div>\
                     <div><a href=\"{link}\">Reset</a></div>"
                ),
            })
            .await
    }
}
