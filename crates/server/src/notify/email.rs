//! Order update emails, SMTP via lettre with Askama templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML template for a status change email.
#[derive(Template)]
#[template(path = "email/status_update.html")]
struct StatusUpdateHtml<'a> {
    name: &'a str,
    order_ref: &'a str,
    status_label: &'a str,
    tracking_id: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

/// Plain text template for a status change email.
#[derive(Template)]
#[template(path = "email/status_update.txt")]
struct StatusUpdateText<'a> {
    name: &'a str,
    order_ref: &'a str,
    status_label: &'a str,
    tracking_id: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

/// HTML template for a tracking-only update email.
#[derive(Template)]
#[template(path = "email/tracking_update.html")]
struct TrackingUpdateHtml<'a> {
    name: &'a str,
    order_ref: &'a str,
    tracking_id: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

/// Plain text template for a tracking-only update email.
#[derive(Template)]
#[template(path = "email/tracking_update.txt")]
struct TrackingUpdateText<'a> {
    name: &'a str,
    order_ref: &'a str,
    tracking_id: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for transactional order emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if SMTP connection fails.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Announce a status change.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_status_update(
        &self,
        to: &str,
        name: &str,
        order_ref: &str,
        status_label: &str,
        tracking_id: Option<&str>,
        tracking_url: Option<&str>,
    ) -> Result<(), EmailError> {
        let html = StatusUpdateHtml {
            name,
            order_ref,
            status_label,
            tracking_id,
            tracking_url,
        }
        .render()?;
        let text = StatusUpdateText {
            name,
            order_ref,
            status_label,
            tracking_id,
            tracking_url,
        }
        .render()?;

        let subject = format!("Your order {order_ref} is {status_label}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Announce new tracking details without claiming a status change.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_tracking_update(
        &self,
        to: &str,
        name: &str,
        order_ref: &str,
        tracking_id: Option<&str>,
        tracking_url: Option<&str>,
    ) -> Result<(), EmailError> {
        let html = TrackingUpdateHtml {
            name,
            order_ref,
            tracking_id,
            tracking_url,
        }
        .render()?;
        let text = TrackingUpdateText {
            name,
            order_ref,
            tracking_id,
            tracking_url,
        }
        .render()?;

        let subject = format!("Tracking details for your order {order_ref}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}
