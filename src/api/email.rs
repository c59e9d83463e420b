//! Outbound email abstraction.
//!
//! Verification codes are delivered synchronously through an `EmailSender`.
//! The caller decides whether a delivery failure is fatal: registration logs
//! and continues, while an explicit send-otp request surfaces the error.
//! The default sender for local dev is `LogEmailSender`, which logs and
//! returns `Ok(())`; SMTP/API delivery is an `EmailSender` implementation.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery abstraction used by the verification flow.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

/// Build the verification-code message sent during signup and resend.
#[must_use]
pub fn verification_email(to_email: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Your Cartmate verification code".to_string(),
        body: format!("Your verification code is {code}. It expires in {ttl_minutes} minutes."),
    }
}
