//! `message/delivery-status` (RFC 3464) parsing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::utils::normalize_whitespace;

static SECTION_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n[ \t]*\n").expect("Failed to compile section regex - this is a bug")
});
static FIELD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9\-]*):\s*(.*)$").expect("Failed to compile field regex - this is a bug")
});
static STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([245])\.\d{1,3}\.\d{1,3}").expect("Failed to compile status regex - this is a bug")
});
static REPLY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(\d{3})(?:[\s\-]+(.*))?$").expect("Failed to compile reply code regex - this is a bug")
});

/// One permanently failed recipient of a delivery status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DsnFailure {
    /// `Final-Recipient`, else `Original-Recipient`; empty if neither is present
    pub recipient: String,
    /// 3-digit SMTP reply code from `Diagnostic-Code`, if it carried one
    pub error_code: Option<String>,
    pub error_message: String,
    /// Per-message fields overlaid with this recipient's fields
    pub fields: BTreeMap<String, String>,
}

/// Extracts every failed recipient with a permanent (`5.x.y`) status.
///
/// Sections with a transient or success status are ignored, as are sections
/// whose diagnostic carries a non-5xx SMTP reply code.
pub(crate) fn parse_delivery_status(text: &str) -> Vec<DsnFailure> {
    let text = text.replace("\r\n", "\n");
    let sections: Vec<&str> = SECTION_BREAK
        .split(text.trim())
        .filter(|section| !section.trim().is_empty())
        .collect();

    let per_message = sections
        .first()
        .map(|section| parse_fields(section))
        .filter(|fields| !fields.contains_key("status"))
        .unwrap_or_default();

    sections
        .iter()
        .filter_map(|section| parse_recipient_section(section, &per_message))
        .collect()
}

fn parse_recipient_section(
    section: &str,
    per_message: &BTreeMap<String, String>,
) -> Option<DsnFailure> {
    let own = parse_fields(section);
    let status = own.get("status")?.split_whitespace().next()?.to_string();
    let caps = STATUS.captures(&status)?;
    if &caps[1] != "5" {
        return None;
    }
    let status = caps[0].to_string();

    let recipient = own
        .get("final_recipient")
        .or_else(|| own.get("original_recipient"))
        .map(|value| {
            strip_address_type(value)
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
        .unwrap_or_default();

    let (error_code, error_message) = match own.get("diagnostic_code") {
        Some(diagnostic) => {
            let diagnostic = strip_address_type(diagnostic);
            match REPLY_CODE.captures(&diagnostic) {
                Some(caps) if caps[1].starts_with('5') => {
                    let message = caps
                        .get(2)
                        .map(|m| normalize_whitespace(m.as_str()))
                        .unwrap_or_default();
                    (Some(caps[1].to_string()), message)
                }
                Some(_) => return None,
                None => (
                    super::heuristics::find_5xx_code(&diagnostic),
                    normalize_whitespace(&diagnostic),
                ),
            }
        }
        None => (None, String::new()),
    };
    let error_message = if error_message.is_empty() {
        format!("DSN status {status}")
    } else {
        error_message
    };

    let mut fields = per_message.clone();
    fields.extend(own);

    Some(DsnFailure {
        recipient,
        error_code,
        error_message,
        fields,
    })
}

/// Parses `Name: value` lines into a map keyed by the lowercased name with
/// hyphens replaced by underscores. Continuation lines are joined with a space.
pub(crate) fn parse_fields(section: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for line in section.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            fields.insert(key, value);
        }
        if let Some(caps) = FIELD_LINE.captures(line) {
            let key = caps[1].to_ascii_lowercase().replace('-', "_");
            current = Some((key, caps[2].trim().to_string()));
        }
    }
    if let Some((key, value)) = current {
        fields.insert(key, value);
    }
    fields
}

/// Drops the `rfc822;`/`smtp;` type prefix of a DSN value.
fn strip_address_type(value: &str) -> String {
    let value = match value.split_once(';') {
        Some((kind, rest)) if !kind.trim().contains(' ') => rest,
        _ => value,
    };
    value.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Reporting-MTA: dns; mx.example.net\r\n\
        Arrival-Date: Tue, 10 Feb 2026 09:15:00 +0000\r\n\
        \r\n\
        Final-Recipient: rfc822; nobody@example.org\r\n\
        Action: failed\r\n\
        Status: 5.1.1\r\n\
        Diagnostic-Code: smtp; 550 5.1.1 <nobody@example.org>: Recipient\r\n\
        \taddress rejected: User unknown\r\n\
        \r\n\
        Final-Recipient: rfc822; later@example.org\r\n\
        Action: delayed\r\n\
        Status: 4.4.1\r\n\
        Diagnostic-Code: smtp; 450 4.4.1 Try again later\r\n";

    #[test]
    fn test_parse_delivery_status_failed_recipient() {
        let failures = parse_delivery_status(REPORT);
        assert_eq!(failures.len(), 1);

        let failure = &failures[0];
        assert_eq!(failure.recipient, "nobody@example.org");
        assert_eq!(failure.error_code.as_deref(), Some("550"));
        assert_eq!(
            failure.error_message,
            "5.1.1 <nobody@example.org>: Recipient address rejected: User unknown"
        );
        assert_eq!(failure.fields.get("action").map(String::as_str), Some("failed"));
        assert_eq!(
            failure.fields.get("reporting_mta").map(String::as_str),
            Some("dns; mx.example.net")
        );
    }

    #[test]
    fn test_parse_delivery_status_without_diagnostic() {
        let report = "Reporting-MTA: dns; mx.example.net\n\n\
            Final-Recipient: rfc822;full@example.org\nAction: failed\nStatus: 5.2.2\n";
        let failures = parse_delivery_status(report);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error_code, None);
        assert_eq!(failures[0].error_message, "DSN status 5.2.2");
    }

    #[test]
    fn test_parse_delivery_status_non_5xx_diagnostic_disqualifies() {
        let report = "Final-Recipient: rfc822; a@example.org\nStatus: 5.0.0\n\
            Diagnostic-Code: smtp; 421 Service not available\n";
        assert!(parse_delivery_status(report).is_empty());
    }

    #[test]
    fn test_parse_delivery_status_only_transient() {
        let report = "Reporting-MTA: dns; mx\n\nFinal-Recipient: rfc822; a@example.org\n\
            Status: 4.2.2\nDiagnostic-Code: smtp; 452 Mailbox full\n";
        assert!(parse_delivery_status(report).is_empty());
    }

    #[test]
    fn test_parse_delivery_status_code_inside_diagnostic() {
        let report = "Final-Recipient: rfc822; <b@example.org>\nStatus: 5.7.1\n\
            Diagnostic-Code: X-Postfix; host mx.example.org said: 554 5.7.1 Rejected\n";
        let failures = parse_delivery_status(report);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].recipient, "b@example.org");
        assert_eq!(failures[0].error_code.as_deref(), Some("554"));
        assert_eq!(
            failures[0].error_message,
            "host mx.example.org said: 554 5.7.1 Rejected"
        );
    }

    #[test]
    fn test_parse_fields_normalizes_names() {
        let fields = parse_fields("X-Postfix-Queue-ID: 4F1\nRemote-MTA: dns; mx\n  (continued)\n");
        assert_eq!(fields.get("x_postfix_queue_id").map(String::as_str), Some("4F1"));
        assert_eq!(fields.get("remote_mta").map(String::as_str), Some("dns; mx (continued)"));
    }

    #[test]
    fn test_strip_address_type() {
        assert_eq!(strip_address_type("rfc822; <a@example.org>"), "<a@example.org>");
        assert_eq!(strip_address_type("a@example.org"), "a@example.org");
    }
}
