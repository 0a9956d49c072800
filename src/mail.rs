//! Email delivery of the coverage report.
//!
//! The report is assembled here and handed to a [`MailTransport`]. The crate
//! ships [`PickupDirTransport`], which drops each message as an `.eml` file
//! for a local relay to pick up.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::config::ReportSettings;
use crate::error::TransportError;
use crate::html;
use crate::types::InventoryRecord;

pub const SUBJECT_PREFIX: &str = "재고 커버리지 분석 리포트";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Sender credentials. Passed through to the transport untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct MailCredentials {
    pub sender: String,
    pub password: String,
}

impl std::fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailCredentials")
            .field("sender", &self.sender)
            .field("password", &"***")
            .finish()
    }
}

pub trait MailTransport {
    fn send(&mut self, credentials: &MailCredentials, message: &EmailMessage) -> Result<(), TransportError>;
}

/// Writes each message to `<dir>/<timestamp>-<n>.eml`.
#[derive(Debug, Clone)]
pub struct PickupDirTransport {
    dir: PathBuf,
    host: String,
    port: u16,
    sent: usize,
}

impl PickupDirTransport {
    pub fn new(dir: impl Into<PathBuf>, settings: &ReportSettings) -> Self {
        Self {
            dir: dir.into(),
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            sent: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Minimal address check. Control characters are refused so a value can
/// never open a new header line.
fn check_address(addr: &str) -> Result<(), TransportError> {
    let valid = !addr.chars().any(char::is_control)
        && match addr.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidAddress(addr.to_string()))
    }
}

/// RFC 2047 encoded-word for non-ASCII header text.
pub fn encode_header(value: &str) -> String {
    if value.is_ascii() && !value.chars().any(|c| c.is_ascii_control()) {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// RFC 5322-style rendering with an HTML body. Addresses must already have
/// passed `check_address`.
pub fn render_eml(message: &EmailMessage, relay: &str) -> String {
    format!(
        "X-Relay: {relay}\r\nFrom: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n\
         Content-Type: text/html; charset=utf-8\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{}",
        message.from,
        message.to,
        encode_header(&message.subject),
        message.html_body.replace('\n', "\r\n"),
    )
}

impl MailTransport for PickupDirTransport {
    fn send(&mut self, credentials: &MailCredentials, message: &EmailMessage) -> Result<(), TransportError> {
        check_address(&credentials.sender)?;
        check_address(&message.from)?;
        check_address(&message.to)?;

        fs::create_dir_all(&self.dir)?;
        self.sent += 1;
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let path = self.dir.join(format!("{stamp}-{}.eml", self.sent));
        let relay = format!("{}:{}", self.host, self.port);
        fs::write(&path, render_eml(message, &relay))?;
        info!(path = %path.display(), to = %message.to, "queued report email");
        Ok(())
    }
}

/// Everything needed to mail one report.
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

impl EmailRequest {
    fn check(&self) -> Result<(), TransportError> {
        let fields = [
            ("sender", &self.sender),
            ("password", &self.password),
            ("recipient", &self.recipient),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(TransportError::MissingField(name));
            }
        }
        for addr in [&self.sender, &self.recipient] {
            if addr.contains(['\r', '\n']) {
                return Err(TransportError::InvalidAddress(addr.clone()));
            }
        }
        Ok(())
    }
}

pub fn report_subject(generated_at: NaiveDateTime) -> String {
    format!("{} - {}", SUBJECT_PREFIX, generated_at.format("%Y-%m-%d"))
}

pub fn build_email_report(
    data: &[InventoryRecord],
    settings: &ReportSettings,
    request: &EmailRequest,
    generated_at: NaiveDateTime,
) -> Result<EmailMessage, TransportError> {
    request.check()?;
    Ok(EmailMessage {
        from: request.sender.clone(),
        to: request.recipient.clone(),
        subject: report_subject(generated_at),
        html_body: html::render_email_body(data, settings, generated_at),
    })
}

/// Assemble and send the report. Returns the message shown to the user.
pub fn send_email_report<T: MailTransport>(
    transport: &mut T,
    data: &[InventoryRecord],
    settings: &ReportSettings,
    request: &EmailRequest,
    generated_at: NaiveDateTime,
) -> Result<String, TransportError> {
    let result = build_email_report(data, settings, request, generated_at).and_then(|message| {
        let credentials = MailCredentials {
            sender: request.sender.clone(),
            password: request.password.clone(),
        };
        transport.send(&credentials, &message)
    });
    match result {
        Ok(()) => Ok("이메일이 성공적으로 발송되었습니다!".to_string()),
        Err(e) => {
            warn!(error = %e, "email report failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::enrich;
    use crate::types::NormalizedRow;
    use chrono::NaiveDate;

    #[derive(Default)]
    struct Capture {
        sent: Vec<(MailCredentials, EmailMessage)>,
    }

    impl MailTransport for Capture {
        fn send(&mut self, credentials: &MailCredentials, message: &EmailMessage) -> Result<(), TransportError> {
            self.sent.push((credentials.clone(), message.clone()));
            Ok(())
        }
    }

    struct Reject;

    impl MailTransport for Reject {
        fn send(&mut self, _: &MailCredentials, _: &EmailMessage) -> Result<(), TransportError> {
            Err(TransportError::Rejected("535 authentication failed".into()))
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(18, 0, 0))
            .expect("date")
    }

    fn data() -> Vec<InventoryRecord> {
        vec![enrich(NormalizedRow {
            store_name: "Gangnam".into(),
            product_name: "Tee".into(),
            product_code: "T-1".into(),
            business_unit: "AP".into(),
            season: "24SS".into(),
            unit_price: 1000.0,
            week1_sales: 1.0,
            week2_sales: 1.0,
            week3_sales: 1.0,
            current_stock_qty: 1.0,
            inventory_value: 1000.0,
        })]
    }

    fn request() -> EmailRequest {
        EmailRequest {
            sender: "ops@example.com".into(),
            password: "app-password".into(),
            recipient: "lead@example.com".into(),
        }
    }

    #[test]
    fn capturing_transport_receives_assembled_message() {
        let mut t = Capture::default();
        let msg = send_email_report(&mut t, &data(), &ReportSettings::default(), &request(), at())
            .expect("sent");
        assert!(msg.contains("성공"));
        let (creds, email) = &t.sent[0];
        assert_eq!(creds.password, "app-password");
        assert_eq!(email.from, "ops@example.com");
        assert_eq!(email.to, "lead@example.com");
        assert_eq!(email.subject, "재고 커버리지 분석 리포트 - 2024-03-09");
        assert!(email.html_body.contains("<td>AP</td>"));
    }

    #[test]
    fn blank_fields_are_rejected_before_sending() {
        let mut t = Capture::default();
        let mut req = request();
        req.password = "  ".into();
        let err = send_email_report(&mut t, &data(), &ReportSettings::default(), &req, at()).unwrap_err();
        assert!(matches!(err, TransportError::MissingField("password")));
        assert!(t.sent.is_empty());
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let err = send_email_report(&mut Reject, &data(), &ReportSettings::default(), &request(), at())
            .unwrap_err();
        assert!(err.to_string().contains("535"));
    }

    #[test]
    fn pickup_dir_writes_eml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut t = PickupDirTransport::new(dir.path().join("outbox"), &ReportSettings::default());
        send_email_report(&mut t, &data(), &ReportSettings::default(), &request(), at()).expect("sent");
        let files: Vec<_> = fs::read_dir(t.dir()).expect("outbox").collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().expect("entry").path();
        let body = fs::read_to_string(path).expect("eml");
        let subject = format!(
            "Subject: =?utf-8?B?{}?=\r\n",
            STANDARD.encode("재고 커버리지 분석 리포트 - 2024-03-09")
        );
        assert!(body.contains(&subject));
        assert!(!body.contains("Subject: 재고"));
        assert!(body.contains("Content-Type: text/html; charset=utf-8"));
        assert!(body.contains("X-Relay: smtp.gmail.com:587"));
    }

    #[test]
    fn pickup_dir_rejects_bad_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut t = PickupDirTransport::new(dir.path(), &ReportSettings::default());
        let mut req = request();
        req.recipient = "lead.example.com".into();
        let err = send_email_report(&mut t, &data(), &ReportSettings::default(), &req, at()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress(a) if a == "lead.example.com"));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = MailCredentials { sender: "a@b".into(), password: "secret".into() };
        assert!(!format!("{c:?}").contains("secret"));
    }

    #[test]
    fn header_line_breaks_in_addresses_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut t = PickupDirTransport::new(dir.path().join("outbox"), &ReportSettings::default());
        let mut req = request();
        req.recipient = "lead@example.com\r\nBcc: x@evil.test".into();
        let err = send_email_report(&mut t, &data(), &ReportSettings::default(), &req, at()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress(_)));
        assert!(!t.dir().exists());

        req = request();
        req.sender = "ops@example.com\nX-Spam: yes".into();
        let err = send_email_report(&mut t, &data(), &ReportSettings::default(), &req, at()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress(_)));
    }

    #[test]
    fn line_breaks_are_rejected_for_any_transport() {
        let mut t = Capture::default();
        let mut req = request();
        req.recipient = "lead@example.com\r\nBcc: x".into();
        let err = send_email_report(&mut t, &data(), &ReportSettings::default(), &req, at()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress(_)));
        assert!(t.sent.is_empty());
    }

    #[test]
    fn ascii_headers_stay_plain() {
        assert_eq!(encode_header("Weekly report"), "Weekly report");
        assert_eq!(encode_header("a\r\nb"), format!("=?utf-8?B?{}?=", STANDARD.encode("a\r\nb")));
        assert_eq!(encode_header("재고"), "=?utf-8?B?7J6s6rOg?=");
    }
}
