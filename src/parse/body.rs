//! MIME walking: splits a bounce into the notice, the embedded original
//! message and the delivery status report.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use super::html::html_to_text;

/// Headers recovered from the embedded original message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct OriginalHeaders {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
}

/// Text content of a bounce, grouped by origin.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct MessageContent {
    /// Plain text written by the reporting MTA
    pub notice_plain: String,
    /// HTML written by the reporting MTA (unconverted)
    pub notice_html: String,
    /// Plain text of the returned message
    pub original_plain: String,
    /// HTML of the returned message (unconverted)
    pub original_html: String,
    /// Body of the first `message/delivery-status` part
    pub delivery_status: Option<String>,
    pub original: OriginalHeaders,
}

impl MessageContent {
    /// All readable text, used for marker and address scanning.
    pub fn searchable_text(&self) -> String {
        let mut text = String::new();
        for chunk in [
            self.notice_plain.clone(),
            html_to_text(&self.notice_html),
            self.delivery_status.clone().unwrap_or_default(),
            self.original_plain.clone(),
        ] {
            if !chunk.is_empty() {
                text.push_str(&chunk);
                text.push('\n');
            }
        }
        text
    }

    fn absorb_original(&mut self, inner: &Message<'_>) {
        self.absorb_headers(inner);
        for part in &inner.parts {
            match &part.body {
                PartType::Text(text) => push_text(&mut self.original_plain, text),
                PartType::Html(html) => push_text(&mut self.original_html, html),
                _ => {}
            }
        }
    }

    fn absorb_headers(&mut self, inner: &Message<'_>) {
        if self.original.subject.is_none() {
            self.original.subject = inner
                .subject()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
        if self.original.from.is_none() {
            self.original.from = inner
                .from()
                .and_then(|addr| addr.first())
                .and_then(|a| a.address())
                .map(str::to_string);
        }
        if self.original.to.is_empty() {
            self.original.to = inner
                .to()
                .map(|list| {
                    list.iter()
                        .filter_map(|a| a.address())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
        }
    }
}

/// Walks the top-level parts of `message`.
///
/// Parts inside an embedded `message/rfc822` belong to the original message;
/// every other text part belongs to the notice.
pub(crate) fn collect_content(message: &Message<'_>) -> MessageContent {
    let mut content = MessageContent::default();

    for part in &message.parts {
        match part_mime_type(part).as_str() {
            "message/delivery-status" | "message/global-delivery-status" => {
                if content.delivery_status.is_none() {
                    content.delivery_status = Some(part_text(part));
                }
            }
            "message/rfc822" | "message/global" => match part.message() {
                Some(inner) => content.absorb_original(inner),
                None => {
                    if let Some(inner) = MessageParser::default().parse(part.contents()) {
                        content.absorb_original(&inner);
                    }
                }
            },
            "text/rfc822-headers" | "message/rfc822-headers" => {
                let headers = part_text(part);
                if let Some(inner) = MessageParser::default().parse(headers.as_bytes()) {
                    content.absorb_headers(&inner);
                }
            }
            _ => match &part.body {
                PartType::Text(text) => push_text(&mut content.notice_plain, text),
                PartType::Html(html) => push_text(&mut content.notice_html, html),
                _ => {}
            },
        }
    }
    content
}

fn part_mime_type(part: &MessagePart<'_>) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(subtype) => format!(
                "{}/{}",
                ct.ctype().trim().to_ascii_lowercase(),
                subtype.trim().to_ascii_lowercase()
            ),
            None => ct.ctype().trim().to_ascii_lowercase(),
        },
        None => String::new(),
    }
}

/// Decoded text of a part, whatever body type the MIME parser chose for it.
fn part_text(part: &MessagePart<'_>) -> String {
    match part.text_contents() {
        Some(text) => text.to_string(),
        None => String::from_utf8_lossy(part.contents()).into_owned(),
    }
}

fn push_text(target: &mut String, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(text);
}
