//! Text heuristics for bounces without a structured delivery report.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::normalize_whitespace;

/// Subject fragments used by common MTAs for non-delivery notices
const SUBJECT_MARKERS: &[&str] = &[
    "undeliverable",
    "undelivered mail",
    "delivery status notification",
    "delivery failure",
    "delivery failed",
    "failure notice",
    "returned mail",
    "mail delivery failed",
    "mail delivery system",
    "non-delivery",
    "not delivered",
    "could not be delivered",
];

/// Local parts of automated bounce senders
const SENDER_MARKERS: &[&str] = &["mailer-daemon", "postmaster", "mail delivery subsystem"];

/// Body fragments announcing a permanent failure
const BODY_MARKERS: &[&str] = &[
    "delivery has failed",
    "could not be delivered",
    "couldn't be delivered",
    "was not delivered",
    "message not delivered",
    "undeliverable",
    "permanent error",
    "permanent failure",
    "failed permanently",
    "delivery to the following recipient",
    "the following address(es) failed",
    "this is the mail system at host",
];

/// SMTP reply patterns, most specific first. Group 1 is the reply code,
/// group 2 the rest of the line.
static REPLY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bsmtp\s*;\s*(\d{3})[\s\-]+([^\r\n]*)",
        r"(?m)^[ \t]*(\d{3})[\s\-]+(\d\.\d{1,3}\.\d{1,3}[^\r\n]*)",
        r"(?i)\b(?:said|replied|responded|answered|response|reply)\s*:?\s*(\d{3})[\s\-]+([^\r\n]*)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile reply pattern - this is a bug"))
    .collect()
});

/// Whether the subject, sender or body announce a delivery failure.
pub(crate) fn looks_like_bounce(subject: &str, sender: &str, body: &str) -> bool {
    let subject = subject.to_lowercase();
    let sender = sender.to_lowercase();
    let body = body.to_lowercase();

    SUBJECT_MARKERS.iter().any(|marker| subject.contains(marker))
        || SENDER_MARKERS.iter().any(|marker| sender.contains(marker))
        || BODY_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Finds the first permanent (5xx) SMTP reply in `text`.
///
/// Returns the reply code and the normalized remainder of its line. Transient
/// (4xx) replies are skipped.
pub(crate) fn find_5xx_reply(text: &str) -> Option<(String, String)> {
    REPLY_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .find(|caps| caps[1].starts_with('5'))
            .map(|caps| (caps[1].to_string(), normalize_whitespace(&caps[2])))
    })
}

/// Reply code of [`find_5xx_reply`].
pub(crate) fn find_5xx_code(text: &str) -> Option<String> {
    find_5xx_reply(text).map(|(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_bounce_markers() {
        assert!(looks_like_bounce("Undeliverable: Invoice", "", ""));
        assert!(looks_like_bounce("Re: hi", "MAILER-DAEMON@mx.example.com", ""));
        assert!(looks_like_bounce("", "", "Your message could not be delivered."));
        assert!(!looks_like_bounce("Lunch?", "alice@example.com", "See you at noon"));
    }

    #[test]
    fn test_find_5xx_reply_smtp_prefix() {
        let body = "Remote server said:\nsmtp; 550 5.1.1 <x@example.org> User unknown\n";
        assert_eq!(
            find_5xx_reply(body),
            Some(("550".to_string(), "5.1.1 <x@example.org> User unknown".to_string()))
        );
    }

    #[test]
    fn test_find_5xx_reply_line_leading() {
        let body = "The error was:\n552 5.2.2 Mailbox full\n";
        assert_eq!(
            find_5xx_reply(body),
            Some(("552".to_string(), "5.2.2 Mailbox full".to_string()))
        );
    }

    #[test]
    fn test_find_5xx_reply_said() {
        let body = "host mx.example.org[1.2.3.4] said: 554 Message rejected as spam (in reply to end of DATA command)";
        assert_eq!(find_5xx_code(body).as_deref(), Some("554"));
    }

    #[test]
    fn test_find_5xx_reply_skips_transient() {
        assert_eq!(find_5xx_reply("smtp; 450 4.2.0 Greylisted, try later"), None);
        assert_eq!(find_5xx_reply("host said: 421 too many connections"), None);
    }

    #[test]
    fn test_find_5xx_reply_ignores_unrelated_numbers() {
        assert_eq!(find_5xx_reply("Order 550 shipped to you"), None);
    }
}
