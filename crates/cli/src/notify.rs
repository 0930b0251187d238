//! E-mail notification over SMTP with STARTTLS.
//!
//! A connection is opened for each send and closed when the send returns.
//! Every recipient gets its own message.

use chrono::Local;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, error, warn};

use crate::config::EmailConfig;

pub const SUBJECT: &str = "OSN Image Processing Automation";

/// Timestamp format used in e-mail bodies
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const RESULTS_TEMPLATE: &str = "\
Start time: [start_time]
End time: [end_time]

[results]
";

const ERROR_TEMPLATE: &str = "\
Start time: [start_time]
End time: [end_time]

Error Message: [error_message]
";

pub fn results_body(results: &str, start_time: &str, end_time: &str) -> String {
    RESULTS_TEMPLATE
        .replace("[start_time]", start_time)
        .replace("[end_time]", end_time)
        .replace("[results]", results)
}

pub fn error_body(message: &str, start_time: &str, end_time: &str) -> String {
    ERROR_TEMPLATE
        .replace("[start_time]", start_time)
        .replace("[end_time]", end_time)
        .replace("[error_message]", message)
}

fn now() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

pub struct EmailSender {
    config: EmailConfig,
}

impl EmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, lettre::transport::smtp::Error> {
        Ok(SmtpTransport::starttls_relay(&self.config.server)?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.user.clone(),
                self.config.password.clone(),
            ))
            .build())
    }

    /// Whether the server accepts a connection and the login.
    pub fn test_connection(&self) -> bool {
        match self.transport().and_then(|t| t.test_connection()) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(server = %self.config.server, error = %e, "Error connecting to SMTP server");
                false
            }
        }
    }

    /// Send `body` to every recipient. Failures are logged per recipient.
    pub fn send(&self, subject: &str, body: &str) {
        let transport = match self.transport() {
            Ok(t) => t,
            Err(e) => {
                error!(server = %self.config.server, error = %e, "Error connecting to SMTP server");
                return;
            }
        };

        for to in &self.config.to {
            let sent = Message::builder()
                .from(self.config.from.clone())
                .to(to.clone())
                .subject(subject)
                .body(body.to_string())
                .map_err(|e| e.to_string())
                .and_then(|message| {
                    transport
                        .send(&message)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                });
            match sent {
                Ok(()) => debug!(to = %to, "Email sent"),
                Err(e) => error!(to = %to, error = %e, "Error sending email"),
            }
        }
    }

    pub fn send_results(&self, results: &str, start_time: &str) {
        self.send(SUBJECT, &results_body(results, start_time, &now()));
    }

    pub fn send_error(&self, message: &str, start_time: &str) {
        self.send(SUBJECT, &error_body(message, start_time, &now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_body() {
        let body = results_body("- No images exported", "2024-01-01 10:00:00", "2024-01-01 10:05:00");
        assert!(body.starts_with("Start time: 2024-01-01 10:00:00\nEnd time: 2024-01-01 10:05:00\n"));
        assert!(body.contains("- No images exported"));
        assert!(!body.contains('['));
    }

    #[test]
    fn test_error_body() {
        let body = error_body("DEM image not found: proj/dem", "s", "e");
        assert!(body.contains("Error Message: DEM image not found: proj/dem"));
    }
}
