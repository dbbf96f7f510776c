// src/services/mailer.rs

//! Mail notifier service.
//!
//! Holds one authenticated SMTP session for the life of the poller and
//! sends a plain-text message per new offer.

use std::time::Duration;

use async_trait::async_trait;
use lettre::Message;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::Error as SmtpError;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::response::{Code, Severity};

use crate::error::{AppError, Result};
use crate::models::{MailConfig, Offer};

/// Delivers offer notifications.
#[async_trait]
pub trait Notifier: Send {
    /// Send one notification for `offer`.
    async fn notify(&mut self, offer: &Offer) -> Result<()>;

    /// End the session.
    async fn close(&mut self) -> Result<()>;
}

/// Compose the notification mail for an offer.
///
/// The subject is the offer summary, the body is its link.
pub fn compose(offer: &Offer, from: &Mailbox, to: &Mailbox) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(offer.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(offer.link.clone())
        .map_err(|e| AppError::send(format!("cannot build message for {}: {e}", offer.link)))
}

/// SMTP notifier over a STARTTLS-upgraded, authenticated session.
pub struct MailNotifier {
    host: String,
    port: u16,
    timeout: Duration,
    credentials: Credentials,
    sender: Mailbox,
    recipient: Mailbox,
    hello: ClientId,
    connection: Option<AsyncSmtpConnection>,
}

impl MailNotifier {
    /// Connect, upgrade to TLS and log in.
    ///
    /// Fails with `AppError::Auth` when the server rejects the credentials
    /// and `AppError::Network` when it cannot be reached or spoken to.
    pub async fn connect(config: &MailConfig) -> Result<Self> {
        let (host, port) = config.endpoint()?;
        let mut notifier = Self {
            host,
            port,
            timeout: config.timeout(),
            credentials: Credentials::new(config.user.clone(), config.password.clone()),
            sender: config.sender_mailbox()?,
            recipient: config.recipient_mailbox()?,
            hello: ClientId::default(),
            connection: None,
        };

        log::debug!("Attempting mail login at {}:{}", notifier.host, notifier.port);
        notifier.connection = Some(notifier.open_session().await?);
        log::info!("Mail login successful");
        Ok(notifier)
    }

    async fn open_session(&self) -> Result<AsyncSmtpConnection> {
        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (self.host.as_str(), self.port),
            Some(self.timeout),
            &self.hello,
            None,
            None,
        )
        .await
        .map_err(|e| AppError::network(format!("{}:{}: {e}", self.host, self.port)))?;

        if !connection.can_starttls() {
            return Err(AppError::network(format!(
                "{}:{} does not offer STARTTLS",
                self.host, self.port
            )));
        }
        let tls = TlsParameters::new(self.host.clone()).map_err(AppError::network)?;
        connection
            .starttls(tls, &self.hello)
            .await
            .map_err(|e| AppError::network(format!("STARTTLS failed: {e}")))?;

        connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &self.credentials)
            .await
            .map_err(classify_login_error)?;
        Ok(connection)
    }

    /// Return a live session, re-establishing it once if the server dropped it.
    async fn session(&mut self) -> Result<&mut AsyncSmtpConnection> {
        let healthy = match self.connection.as_mut() {
            Some(connection) => !connection.has_broken() && connection.test_connected().await,
            None => false,
        };

        if !healthy {
            self.connection = None;
            log::info!(
                "Mail session to {}:{} lost, reconnecting",
                self.host,
                self.port
            );
            let connection = self
                .open_session()
                .await
                .map_err(|e| AppError::send(format!("reconnect failed: {e}")))?;
            self.connection = Some(connection);
        }

        self.connection
            .as_mut()
            .ok_or_else(|| AppError::send("no mail session"))
    }
}

/// Map a failed AUTH exchange to `Auth` or `Network`.
///
/// `Auth`: a 5xx reply (535 bad credentials, 534 mechanism too weak,
/// 530 auth required) or a client-side failure such as no mechanism in
/// common with the server. `Network`: 4xx replies (454 temporary auth
/// failure), I/O, TLS and timeouts.
fn classify_login_error(error: SmtpError) -> AppError {
    if error.is_client() || is_rejection(error.status()) {
        AppError::auth(error)
    } else {
        AppError::network(format!("login failed: {error}"))
    }
}

fn is_rejection(code: Option<Code>) -> bool {
    code.is_some_and(|c| c.severity == Severity::PermanentNegativeCompletion)
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn notify(&mut self, offer: &Offer) -> Result<()> {
        let message = compose(offer, &self.sender, &self.recipient)?;
        let bytes = message.formatted();

        let session = self.session().await?;
        session
            .send(message.envelope(), &bytes)
            .await
            .map_err(|e| AppError::send(format!("{}: {e}", offer.link)))?;

        log::debug!("Notification sent for {}", offer.link);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut connection) = self.connection.take() {
            connection
                .quit()
                .await
                .map_err(|e| AppError::network(format!("QUIT failed: {e}")))?;
            log::debug!("Mail session closed");
        }
        Ok(())
    }
}
