//! Email service for registration codes and new-order alerts.
//!
//! Uses SMTP via lettre for delivery with Askama templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::Order;

/// HTML template for the registration code email.
#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpEmailHtml<'a> {
    name: &'a str,
    otp: &'a str,
}

/// Plain text template for the registration code email.
#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpEmailText<'a> {
    name: &'a str,
    otp: &'a str,
}

/// HTML template for the admin new-order alert.
#[derive(Template)]
#[template(path = "email/new_order.html")]
struct NewOrderEmailHtml<'a> {
    order_id: &'a str,
    user_email: &'a str,
    total_amount: &'a str,
    payment_method: &'a str,
    items: &'a str,
}

/// Plain text template for the admin new-order alert.
#[derive(Template)]
#[template(path = "email/new_order.txt")]
struct NewOrderEmailText<'a> {
    order_id: &'a str,
    user_email: &'a str,
    total_amount: &'a str,
    payment_method: &'a str,
    items: &'a str,
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

/// Email service for sending transactional emails.
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
    /// Returns error if the SMTP relay cannot be configured.
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

    /// Send the registration code to a new user.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_otp(&self, to: &str, name: &str, otp: &str) -> Result<(), EmailError> {
        let name = if name.is_empty() { to } else { name };
        let html = OtpEmailHtml { name, otp }.render()?;
        let text = OtpEmailText { name, otp }.render()?;

        self.send_multipart_email(to, "Your OTP for 1nceMore Registration", &text, &html)
            .await
    }

    /// Alert one admin about a new order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_new_order(&self, to: &str, order: &Order) -> Result<(), EmailError> {
        let order_id = order.id.to_string();
        let total_amount = order.total_amount.to_string();
        let items = item_summary(order);

        let html = NewOrderEmailHtml {
            order_id: &order_id,
            user_email: order.user_email.as_str(),
            total_amount: &total_amount,
            payment_method: order.payment_method.as_str(),
            items: &items,
        }
        .render()?;
        let text = NewOrderEmailText {
            order_id: &order_id,
            user_email: order.user_email.as_str(),
            total_amount: &total_amount,
            payment_method: order.payment_method.as_str(),
            items: &items,
        }
        .render()?;

        self.send_multipart_email(to, "New Order Placed", &text, &html)
            .await
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

/// `name (xN)` for each line, comma separated.
fn item_summary(order: &Order) -> String {
    order
        .items
        .iter()
        .map(|item| format!("{} (x{})", item.name, item.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}
