//! Email service for verification codes, password resets and order receipts.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. Without an
//! SMTP configuration the rendered text body is written to the log instead,
//! which keeps development setups working.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::order::{Order, OrderItem};

#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeHtml<'a> {
    name: &'a str,
    store_name: &'a str,
    code: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/verification_code.txt")]
struct VerificationCodeText<'a> {
    name: &'a str,
    store_name: &'a str,
    code: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    store_name: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
    store_name: &'a str,
    reset_url: &'a str,
}

/// One line of an order receipt, pre-formatted for templates.
struct ReceiptLine {
    name: String,
    quantity: i32,
    total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    lines: &'a [ReceiptLine],
    subtotal: String,
    shipping: String,
    tax: String,
    total: String,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order_number: &'a str,
    lines: &'a [ReceiptLine],
    subtotal: String,
    shipping: String,
    tax: String,
    total: String,
    order_url: &'a str,
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
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl EmailService {
    /// Create an email service. `None` logs messages instead of sending them.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            tracing::warn!("SMTP_HOST not set; outgoing email will be logged, not sent");
            return Ok(Self {
                mailer: None,
                from_address: "SolarShop <noreply@localhost>".to_string(),
            });
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Some(mailer),
            from_address: config.from_address.clone(),
        })
    }

    /// Send an email verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_verification_code(
        &self,
        to: &str,
        name: &str,
        store_name: &str,
        code: &str,
        expires_minutes: i64,
    ) -> Result<(), EmailError> {
        let html = VerificationCodeHtml {
            name,
            store_name,
            code,
            expires_minutes,
        }
        .render()?;
        let text = VerificationCodeText {
            name,
            store_name,
            code,
            expires_minutes,
        }
        .render()?;

        self.send_multipart_email(
            to,
            &format!("Your {store_name} verification code"),
            &text,
            &html,
        )
        .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        store_name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let html = PasswordResetHtml {
            name,
            store_name,
            reset_url,
        }
        .render()?;
        let text = PasswordResetText {
            name,
            store_name,
            reset_url,
        }
        .render()?;

        self.send_multipart_email(
            to,
            &format!("Reset your {store_name} password"),
            &text,
            &html,
        )
        .await
    }

    /// Send an order receipt.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        name: &str,
        order: &Order,
        items: &[OrderItem],
        order_url: &str,
    ) -> Result<(), EmailError> {
        let lines: Vec<ReceiptLine> = items
            .iter()
            .map(|item| ReceiptLine {
                name: item.product_name.clone(),
                quantity: item.quantity,
                total: kes(item.line_total),
            })
            .collect();

        let html = OrderConfirmationHtml {
            name,
            order_number: &order.order_number,
            lines: &lines,
            subtotal: kes(order.subtotal),
            shipping: kes(order.shipping_fee),
            tax: kes(order.tax),
            total: kes(order.total),
            order_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            name,
            order_number: &order.order_number,
            lines: &lines,
            subtotal: kes(order.subtotal),
            shipping: kes(order.shipping_fee),
            tax: kes(order.tax),
            total: kes(order.total),
            order_url,
        }
        .render()?;

        self.send_multipart_email(
            to,
            &format!("Order {} received", order.order_number),
            &text,
            &html,
        )
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

        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %to, subject = %subject, body = %text_body, "Email (not sent, SMTP disabled)");
            return Ok(());
        };

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn kes(amount: rust_decimal::Decimal) -> String {
    format!("KES {amount:.2}")
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_verification_code_range() {
        for _ in 0..100 {
            let code: u32 = generate_verification_code().parse().unwrap();
            assert!((100_000..1_000_000).contains(&code));
        }
    }

    #[test]
    fn test_kes_format() {
        assert_eq!(kes(Decimal::new(1_250, 0)), "KES 1250.00");
        assert_eq!(kes(Decimal::new(995, 1)), "KES 99.50");
    }

    #[test]
    fn test_verification_text_renders_code() {
        let text = VerificationCodeText {
            name: "Achieng",
            store_name: "SolarShop",
            code: "123456",
            expires_minutes: 15,
        }
        .render()
        .unwrap();
        assert!(text.contains("123456"));
        assert!(text.contains("15 minutes"));
    }

    #[tokio::test]
    async fn test_send_without_smtp_logs() {
        let service = EmailService::new(None).unwrap();
        service
            .send_password_reset(
                "customer@example.com",
                "Otieno",
                "SolarShop",
                "http://localhost/reset?token=abc",
            )
            .await
            .unwrap();
    }
}
