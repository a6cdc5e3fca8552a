//! Dispatch request construction and validation

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recipients must look like E.164 numbers, optionally with a leading '+'.
/// ASCII digits only: `\d` would also admit other Unicode digit scripts.
static RECIPIENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9][0-9]{1,14}$").unwrap());

/// MIME types accepted for image attachments
pub const IMAGE_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif"];

/// MIME types accepted for document attachments
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
];

/// Errors rejecting a whole request before anything is sent
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchValidationError {
    #[error("at least one recipient is required")]
    NoRecipients,

    #[error("too many recipients: {count} (maximum {max})")]
    TooManyRecipients { count: usize, max: usize },

    #[error("invalid phone number: {0}")]
    InvalidRecipient(String),

    #[error("Message exceeds the maximum length of {max} characters")]
    MessageTooLong { length: usize, max: usize },

    #[error("message cannot be empty without an attachment")]
    EmptyMessage,

    #[error("unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("file exceeds the maximum size of {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("only a single file may be attached")]
    MultipleFiles,

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

/// How an attachment is uploaded and presented to recipients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Document,
}

impl MediaKind {
    /// Classify a MIME type against the allow-list
    pub fn classify(mime_type: &str) -> Option<Self> {
        let essence = mime_essence(mime_type);

        if IMAGE_MIME_TYPES.contains(&essence.as_str()) {
            Some(Self::Image)
        } else if DOCUMENT_MIME_TYPES.contains(&essence.as_str()) {
            Some(Self::Document)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased MIME type without parameters ("Text/CSV; charset=utf-8" -> "text/csv")
fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// A single binary payload accompanying a dispatch
#[derive(Debug, Clone)]
pub struct Attachment {
    bytes: Bytes,
    mime_type: String,
    filename: String,
    kind: MediaKind,
}

impl Attachment {
    /// Create an attachment, rejecting MIME types outside the allow-list
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Result<Self, DispatchValidationError> {
        let mime_type = mime_type.into();
        let kind = MediaKind::classify(&mime_type)
            .ok_or_else(|| DispatchValidationError::UnsupportedMediaType(mime_type.clone()))?;

        Ok(Self {
            bytes: bytes.into(),
            mime_type: mime_essence(&mime_type),
            filename: filename.into(),
            kind,
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bounds applied when building a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchLimits {
    pub max_message_length: usize,
    pub max_recipients: usize,
    pub max_file_bytes: usize,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_message_length: 250,
            max_recipients: 500,
            max_file_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Split a free-text recipient list on whitespace
pub fn tokenize_recipients(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// A validated recipient phone number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipient(String);

impl Recipient {
    pub fn parse(value: &str) -> Result<Self, DispatchValidationError> {
        let value = value.trim();
        if !RECIPIENT_PATTERN.is_match(value) {
            return Err(DispatchValidationError::InvalidRecipient(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// The number as given by the caller (used in failure reports)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, without the leading '+'
    pub fn digits(&self) -> &str {
        self.0.trim_start_matches('+')
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logical send operation: ordered recipients, text, and at most one file
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    recipients: Vec<Recipient>,
    message: String,
    attachment: Option<Attachment>,
}

impl DispatchRequest {
    /// Validate raw input into a request. All checks run before any send,
    /// and a single failing check rejects the whole request.
    pub fn new(
        recipients: Vec<String>,
        message: impl Into<String>,
        attachment: Option<Attachment>,
        limits: &DispatchLimits,
    ) -> Result<Self, DispatchValidationError> {
        let message = message.into();

        let length = message.chars().count();
        if length > limits.max_message_length {
            return Err(DispatchValidationError::MessageTooLong {
                length,
                max: limits.max_message_length,
            });
        }

        if attachment.is_none() && message.trim().is_empty() {
            return Err(DispatchValidationError::EmptyMessage);
        }

        if recipients.is_empty() {
            return Err(DispatchValidationError::NoRecipients);
        }

        if recipients.len() > limits.max_recipients {
            return Err(DispatchValidationError::TooManyRecipients {
                count: recipients.len(),
                max: limits.max_recipients,
            });
        }

        let recipients = recipients
            .iter()
            .map(|r| Recipient::parse(r))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(file) = &attachment {
            if file.len() > limits.max_file_bytes {
                return Err(DispatchValidationError::FileTooLarge {
                    size: file.len(),
                    max: limits.max_file_bytes,
                });
            }
        }

        Ok(Self {
            recipients,
            message,
            attachment,
        })
    }

    /// Same as `new`, with recipients given as whitespace-separated text
    pub fn from_text(
        recipients: &str,
        message: impl Into<String>,
        attachment: Option<Attachment>,
        limits: &DispatchLimits,
    ) -> Result<Self, DispatchValidationError> {
        Self::new(tokenize_recipients(recipients), message, attachment, limits)
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_mime() {
        assert_eq!(MediaKind::classify("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::classify("IMAGE/JPEG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::classify("application/pdf"), Some(MediaKind::Document));
        assert_eq!(
            MediaKind::classify("text/csv; charset=utf-8"),
            Some(MediaKind::Document)
        );
        assert_eq!(MediaKind::classify("application/zip"), None);
        assert_eq!(MediaKind::classify("image/svg+xml"), None);
    }

    #[test]
    fn test_attachment_rejects_zip() {
        let result = Attachment::new(vec![1u8, 2, 3], "application/zip", "a.zip");
        assert_eq!(
            result.unwrap_err(),
            DispatchValidationError::UnsupportedMediaType("application/zip".to_string())
        );
    }

    #[test]
    fn test_tokenize_recipients() {
        assert_eq!(
            tokenize_recipients("  4915112345678\n+4915187654321\t 123 "),
            numbers(&["4915112345678", "+4915187654321", "123"])
        );
        assert!(tokenize_recipients(" \n\t ").is_empty());
    }

    #[test]
    fn test_recipient_digits() {
        let r = Recipient::parse("+4915112345678").unwrap();
        assert_eq!(r.digits(), "4915112345678");
        assert_eq!(r.as_str(), "+4915112345678");
    }

    #[test]
    fn test_recipient_pattern() {
        assert!(Recipient::parse("12").is_ok());
        assert!(Recipient::parse("123456789012345").is_ok());
        assert!(Recipient::parse("1234567890123456").is_err());
        assert!(Recipient::parse("0123").is_err());
        assert!(Recipient::parse("1").is_err());
        assert!(Recipient::parse("12-34").is_err());
        // Arabic-Indic and full-width digits
        assert!(Recipient::parse("4\u{0661}\u{0662}\u{0663}").is_err());
        assert!(Recipient::parse("\u{FF14}\u{FF19}\u{FF11}\u{FF11}").is_err());
    }

    #[test]
    fn test_message_length_limit() {
        let limits = DispatchLimits::default();

        let ok = DispatchRequest::new(numbers(&["4911"]), "a".repeat(250), None, &limits);
        assert!(ok.is_ok());

        let err = DispatchRequest::new(numbers(&["4911"]), "a".repeat(251), None, &limits);
        assert_eq!(
            err.unwrap_err(),
            DispatchValidationError::MessageTooLong {
                length: 251,
                max: 250
            }
        );
    }

    #[test]
    fn test_message_length_counts_chars() {
        let limits = DispatchLimits::default();
        let message = "ü".repeat(250);
        assert!(DispatchRequest::new(numbers(&["4911"]), message, None, &limits).is_ok());
    }

    #[test]
    fn test_empty_recipients() {
        let limits = DispatchLimits::default();
        let err = DispatchRequest::from_text("   ", "hello", None, &limits).unwrap_err();
        assert_eq!(err, DispatchValidationError::NoRecipients);
    }

    #[test]
    fn test_invalid_recipient_rejects_whole_request() {
        let limits = DispatchLimits::default();
        let err =
            DispatchRequest::new(numbers(&["4911", "abc", "4922"]), "hi", None, &limits).unwrap_err();
        assert_eq!(err.to_string(), "invalid phone number: abc");
    }

    #[test]
    fn test_too_many_recipients() {
        let limits = DispatchLimits {
            max_recipients: 2,
            ..Default::default()
        };
        let err = DispatchRequest::new(numbers(&["4911", "4922", "4933"]), "hi", None, &limits)
            .unwrap_err();
        assert_eq!(
            err,
            DispatchValidationError::TooManyRecipients { count: 3, max: 2 }
        );
    }

    #[test]
    fn test_empty_message_requires_attachment() {
        let limits = DispatchLimits::default();
        assert_eq!(
            DispatchRequest::new(numbers(&["4911"]), "  ", None, &limits).unwrap_err(),
            DispatchValidationError::EmptyMessage
        );

        let file = Attachment::new(vec![0u8; 4], "image/png", "pic.png").unwrap();
        let request = DispatchRequest::new(numbers(&["4911"]), "", Some(file), &limits).unwrap();
        assert_eq!(request.attachment().unwrap().kind(), MediaKind::Image);
    }

    #[test]
    fn test_file_too_large() {
        let limits = DispatchLimits {
            max_file_bytes: 3,
            ..Default::default()
        };
        let file = Attachment::new(vec![0u8; 4], "application/pdf", "doc.pdf").unwrap();
        let err = DispatchRequest::new(numbers(&["4911"]), "hi", Some(file), &limits).unwrap_err();
        assert_eq!(err, DispatchValidationError::FileTooLarge { size: 4, max: 3 });
    }

    #[test]
    fn test_order_preserved() {
        let limits = DispatchLimits::default();
        let request =
            DispatchRequest::new(numbers(&["4933", "4911", "4933"]), "hi", None, &limits).unwrap();
        let got: Vec<&str> = request.recipients().iter().map(|r| r.as_str()).collect();
        assert_eq!(got, vec!["4933", "4911", "4933"]);
    }
}
