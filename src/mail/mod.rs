//! Mail source abstraction and inbound message parsing.
//!
//! The pipeline never holds a mailbox handle — only value data parsed
//! out of raw messages and file paths produced by the source. Any
//! transport (IMAP, Graph, a directory of .eml files) can sit behind
//! [`MailSource`].

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// Summary of one inbound email, as the classifier sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    /// Source-native message id.
    pub id: String,
    /// Subject line, empty string when absent.
    pub subject: String,
    /// Sender address.
    pub sender: String,
    /// Human-readable sender name, if the header carried one.
    pub sender_name: Option<String>,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

/// Parse a raw RFC 5322 message into an [`EmailSummary`].
pub fn parse_email(id: &str, raw: &[u8]) -> Result<EmailSummary, MailError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MailError::Parse {
            id: id.to_string(),
            reason: "not a parseable RFC 5322 message".to_string(),
        })?;

    let subject = message.subject().unwrap_or_default().to_string();

    let (sender, sender_name) = match message.from().and_then(|a| a.first()) {
        Some(addr) => (
            addr.address().unwrap_or_default().to_string(),
            addr.name().map(str::to_string),
        ),
        None => (String::new(), None),
    };

    let received_at = message
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(Utc::now);

    Ok(EmailSummary {
        id: id.to_string(),
        subject,
        sender,
        sender_name,
        received_at,
    })
}

/// Mailbox access — pure I/O, no business logic.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// List messages currently in a folder.
    async fn list_emails(&self, folder: &str) -> Result<Vec<EmailSummary>, MailError>;

    /// Save a message's attachments to disk.
    ///
    /// Returns the directory the attachments were written to, or `None`
    /// when the message had no attachments at all.
    async fn get_attachments(&self, email_id: &str) -> Result<Option<PathBuf>, MailError>;

    /// Move a message between folders.
    async fn move_email(&self, email_id: &str, from: &str, to: &str) -> Result<(), MailError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &[u8] = b"From: Alice Reviewer <alice@agency.example>\r\n\
To: intake@agency.example\r\n\
Subject: FW: Institutional Control Submission - Site 123\r\n\
Date: Mon, 12 Jan 2026 10:00:00 +0000\r\n\
\r\n\
See attached shapefile.\r\n";

    #[test]
    fn parses_subject_and_sender() {
        let summary = parse_email("msg-1", RAW).unwrap();
        assert_eq!(
            summary.subject,
            "FW: Institutional Control Submission - Site 123"
        );
        assert_eq!(summary.sender, "alice@agency.example");
        assert_eq!(summary.sender_name.as_deref(), Some("Alice Reviewer"));
    }

    #[test]
    fn missing_subject_becomes_empty_string() {
        let raw = b"From: bob@agency.example\r\n\r\nbody\r\n";
        let summary = parse_email("msg-2", raw).unwrap();
        assert_eq!(summary.subject, "");
    }

    #[test]
    fn garbage_bytes_fail_parse() {
        // mail-parser is lenient; a fully empty input is the reliable
        // unparseable case.
        assert!(parse_email("msg-3", b"").is_err());
    }
}
