//! Bounce detection and extraction.
//!
//! This module turns a raw message into zero or more [`BounceRecord`]s:
//! - Structured delivery status reports (`message/delivery-status`), one record
//!   per permanently failed recipient
//! - A text heuristic for notices without a structured report
//! - Original sender, recipient and subject recovery from the embedded message
//! - Whitespace-normalized body excerpts (notice/original × plain/HTML)
//!
//! Only permanent (5xx) failures produce records.

mod body;
mod dsn;
mod heuristics;
pub mod html;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::DateTime;
use mail_parser::{Message, MessageParser};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::MAX_BODY_EXCERPT_CHARS;
use crate::error_handling::ParseError;
use crate::mailbox::RawMessage;
use crate::utils::excerpt;

use body::MessageContent;
pub use html::html_to_text;

/// Display format of [`BounceRecord::date`]
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w.+\-]+@[\w\-]+(?:\.[\w\-]+)+").expect("Failed to compile address regex - this is a bug")
});
static BODY_FROM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^From:[ \t]*(.+?)[ \t\r]*$").expect("Failed to compile From regex - this is a bug")
});
static BODY_SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^Subject:[ \t]*(.+?)[ \t\r]*$").expect("Failed to compile Subject regex - this is a bug")
});

/// Keywords marking body lines that name the failed recipient
const RECIPIENT_LINE_KEYWORDS: &[&str] = &[
    "recipient",
    "rcpt to",
    "original-recipient",
    "final-recipient",
];

/// One permanent delivery failure extracted from a bounce message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceRecord {
    /// Bounce `Date` header as `YYYY-MM-DD HH:MM:SS`, else the receive time
    pub date: String,
    /// Folder the bounce was found in
    pub folder: String,
    /// 3-digit SMTP reply code; `None` when only a `5.x.y` status was reported
    pub error_code: Option<String>,
    /// Failure cause as reported by the remote server
    pub error_message: String,
    /// Sender of the original message
    pub from_addr: String,
    /// Failed recipient
    pub to_addr: String,
    /// Subject of the original message
    pub subject: String,
    pub body_plain: String,
    pub body_html: String,
    pub body_plain_original: String,
    pub body_html_original: String,
    /// Normalized delivery status fields (empty without a structured report)
    pub delivery_status: BTreeMap<String, String>,
}

impl BounceRecord {
    /// A record is admissible only for permanent failures.
    pub fn is_permanent_failure(&self) -> bool {
        match self.error_code.as_deref() {
            Some(code) => code.len() == 3 && code.starts_with('5'),
            None => self
                .delivery_status
                .get("status")
                .is_some_and(|status| status.trim_start().starts_with('5')),
        }
    }
}

/// A failure before it is combined with the message-level fields.
struct Failure {
    recipient: String,
    error_code: Option<String>,
    error_message: String,
    fields: BTreeMap<String, String>,
}

/// Returns the first bounce record of `raw`, if it is a 5xx bounce.
///
/// Malformed messages are logged and yield `None`.
pub fn parse_bounce(raw: &RawMessage) -> Option<BounceRecord> {
    parse_bounces(raw).into_iter().next()
}

/// Returns one bounce record per permanently failed recipient of `raw`.
///
/// Malformed messages are logged and yield no records.
pub fn parse_bounces(raw: &RawMessage) -> Vec<BounceRecord> {
    match try_parse_bounces(raw) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("{e}");
            Vec::new()
        }
    }
}

/// Like [`parse_bounces`], but reports malformed messages to the caller.
///
/// # Errors
///
/// Returns `ParseError::Malformed` if the payload is not a MIME message.
pub fn try_parse_bounces(raw: &RawMessage) -> Result<Vec<BounceRecord>, ParseError> {
    let malformed = || ParseError::Malformed {
        folder: raw.folder.clone(),
        uid: raw.uid,
    };
    let message = MessageParser::default()
        .parse(&raw.bytes)
        .ok_or_else(malformed)?;
    if message.parts.first().map_or(true, |root| root.headers.is_empty()) {
        return Err(malformed());
    }

    let content = body::collect_content(&message);
    let text = content.searchable_text();

    let failures: Vec<Failure> = match content.delivery_status.as_deref() {
        Some(report) => dsn::parse_delivery_status(report)
            .into_iter()
            .map(|failure| Failure {
                recipient: failure.recipient,
                error_code: failure.error_code,
                error_message: failure.error_message,
                fields: failure.fields,
            })
            .collect(),
        None => heuristic_failure(&message, &text).into_iter().collect(),
    };
    if failures.is_empty() {
        return Ok(Vec::new());
    }

    let recipients = failed_recipients(&message, &text, &content);
    let from_addr = original_sender(&message, &text, &content);
    let subject = original_subject(&message, &text, &content);
    let date = record_date(&message, raw);

    let body_plain = excerpt(&content.notice_plain, MAX_BODY_EXCERPT_CHARS);
    let body_html = excerpt(&html_to_text(&content.notice_html), MAX_BODY_EXCERPT_CHARS);
    let body_plain_original = excerpt(&content.original_plain, MAX_BODY_EXCERPT_CHARS);
    let body_html_original = excerpt(&html_to_text(&content.original_html), MAX_BODY_EXCERPT_CHARS);

    let records = failures
        .into_iter()
        .enumerate()
        .map(|(index, failure)| {
            let to_addr = if failure.recipient.is_empty() {
                recipients
                    .get(index.min(recipients.len().saturating_sub(1)))
                    .cloned()
                    .unwrap_or_default()
            } else {
                failure.recipient
            };
            BounceRecord {
                date: date.clone(),
                folder: raw.folder.clone(),
                error_code: failure.error_code,
                error_message: failure.error_message,
                from_addr: from_addr.clone(),
                to_addr,
                subject: subject.clone(),
                body_plain: body_plain.clone(),
                body_html: body_html.clone(),
                body_plain_original: body_plain_original.clone(),
                body_html_original: body_html_original.clone(),
                delivery_status: failure.fields,
            }
        })
        .filter(BounceRecord::is_permanent_failure)
        .collect();
    Ok(records)
}

fn heuristic_failure(message: &Message<'_>, text: &str) -> Option<Failure> {
    let subject = message.subject().unwrap_or_default();
    let sender = message
        .from()
        .and_then(|addr| addr.first())
        .map(|a| format!("{} {}", a.name().unwrap_or_default(), a.address().unwrap_or_default()))
        .unwrap_or_default();

    if !heuristics::looks_like_bounce(subject, &sender, text) {
        return None;
    }
    let (code, message) = heuristics::find_5xx_reply(text)?;
    Some(Failure {
        recipient: String::new(),
        error_code: Some(code),
        error_message: message,
        fields: BTreeMap::new(),
    })
}

/// `X-Failed-Recipients`, else addresses on recipient lines of the body, else
/// the recipients of the embedded original.
fn failed_recipients(message: &Message<'_>, text: &str, content: &MessageContent) -> Vec<String> {
    let from_header: Vec<String> = message
        .header_raw("X-Failed-Recipients")
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if !from_header.is_empty() {
        return from_header;
    }

    let mut from_body: Vec<String> = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        if RECIPIENT_LINE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            for addr in EMAIL_ADDRESS.find_iter(line) {
                let addr = addr.as_str().to_string();
                if !from_body.contains(&addr) {
                    from_body.push(addr);
                }
            }
        }
    }
    if !from_body.is_empty() {
        return from_body;
    }

    content.original.to.clone()
}

/// The bounce's `To` (the notice is addressed to the original sender), else the
/// original `From`, else a `From:` line of the body.
fn original_sender(message: &Message<'_>, text: &str, content: &MessageContent) -> String {
    message
        .to()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(str::to_string)
        .or_else(|| content.original.from.clone())
        .or_else(|| {
            BODY_FROM_LINE
                .captures(text)
                .and_then(|caps| EMAIL_ADDRESS.find(&caps[1]).map(|m| m.as_str().to_string()))
        })
        .unwrap_or_default()
}

fn original_subject(message: &Message<'_>, text: &str, content: &MessageContent) -> String {
    content
        .original
        .subject
        .clone()
        .or_else(|| BODY_SUBJECT_LINE.captures(text).map(|caps| caps[1].trim().to_string()))
        .or_else(|| message.subject().map(|s| s.trim().to_string()))
        .unwrap_or_default()
}

fn record_date(message: &Message<'_>, raw: &RawMessage) -> String {
    message
        .date()
        .and_then(|date| DateTime::parse_from_rfc3339(&date.to_rfc3339()).ok())
        .or(raw.received)
        .map(|date| date.format(RECORD_DATE_FORMAT).to_string())
        .unwrap_or_default()
}
