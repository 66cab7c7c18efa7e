// Parse module tests.

use super::*;

fn raw(bytes: &str) -> RawMessage {
    RawMessage::new("INBOX", 1, bytes.replace('\n', "\r\n"))
}

/// A multipart/report bounce with one delivery status section per
/// `(recipient, status, diagnostic)`.
fn dsn_bounce(recipients: &[(&str, &str, &str)]) -> String {
    let mut report = String::from("Reporting-MTA: dns; mx.example.org\nArrival-Date: Tue, 10 Feb 2026 09:14:58 +0000\n");
    for (recipient, status, diagnostic) in recipients {
        report.push_str(&format!(
            "\nFinal-Recipient: rfc822; {recipient}\nAction: failed\nStatus: {status}\nDiagnostic-Code: smtp; {diagnostic}\n"
        ));
    }
    format!(
        "From: Mail Delivery System <MAILER-DAEMON@mx.example.org>
To: sender@ourco.example
Subject: Undelivered Mail Returned to Sender
Date: Tue, 10 Feb 2026 09:15:00 +0000
Message-ID: <bounce-1@mx.example.org>
MIME-Version: 1.0
Content-Type: multipart/report; report-type=delivery-status; boundary=\"BOUNDARY\"

--BOUNDARY
Content-Type: text/plain; charset=utf-8

This is the mail system at host mx.example.org.
Your message could not be delivered to one or more recipients.

--BOUNDARY
Content-Type: message/delivery-status

{report}
--BOUNDARY
Content-Type: message/rfc822

From: Sender <sender@ourco.example>
To: nobody@example.org
Subject: Quarterly invoice
Date: Tue, 10 Feb 2026 09:14:50 +0000
Message-ID: <orig-1@ourco.example>

Please find the invoice attached.

--BOUNDARY--
"
    )
}

#[test]
fn test_parse_bounce_dsn_550() {
    let message = raw(&dsn_bounce(&[(
        "nobody@example.org",
        "5.1.1",
        "550 5.1.1 <nobody@example.org>: Recipient address rejected: User unknown",
    )]));
    let record = parse_bounce(&message).expect("550 bounce should produce a record");

    assert_eq!(record.error_code.as_deref(), Some("550"));
    assert_eq!(
        record.error_message,
        "5.1.1 <nobody@example.org>: Recipient address rejected: User unknown"
    );
    assert!(!record.delivery_status.is_empty());
    assert_eq!(record.delivery_status.get("status").map(String::as_str), Some("5.1.1"));
    assert_eq!(
        record.delivery_status.get("reporting_mta").map(String::as_str),
        Some("dns; mx.example.org")
    );
    assert_eq!(record.to_addr, "nobody@example.org");
    assert_eq!(record.from_addr, "sender@ourco.example");
    assert_eq!(record.subject, "Quarterly invoice");
    assert_eq!(record.date, "2026-02-10 09:15:00");
    assert_eq!(record.folder, "INBOX");
    assert!(record.body_plain.contains("could not be delivered"));
    assert!(record.body_plain_original.contains("invoice attached"));
    assert_eq!(record.body_html, "");
    assert_eq!(record.body_html_original, "");
}

#[test]
fn test_parse_bounce_transient_450_yields_nothing() {
    let message = raw(&dsn_bounce(&[(
        "busy@example.org",
        "4.2.2",
        "450 4.2.2 Mailbox temporarily full",
    )]));
    assert_eq!(parse_bounce(&message), None);
    assert!(parse_bounces(&message).is_empty());
}

#[test]
fn test_parse_bounces_one_record_per_failed_recipient() {
    let message = raw(&dsn_bounce(&[
        ("full@example.org", "5.2.2", "552 5.2.2 Mailbox full"),
        ("later@example.org", "4.4.1", "451 4.4.1 Try again later"),
        ("gone@example.org", "5.1.1", "550 5.1.1 No such user"),
    ]));
    let records = parse_bounces(&message);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].to_addr, "full@example.org");
    assert_eq!(records[0].error_code.as_deref(), Some("552"));
    assert_eq!(records[1].to_addr, "gone@example.org");
    assert_eq!(parse_bounce(&message), Some(records[0].clone()));
}

#[test]
fn test_parse_bounce_non_bounce_message() {
    let message = raw("From: alice@example.com
To: bob@example.com
Subject: Lunch on Friday?
Date: Mon, 09 Feb 2026 12:00:00 +0100

Error 550 in the spreadsheet again, see you at lunch.
");
    assert_eq!(parse_bounce(&message), None);
}

#[test]
fn test_parse_bounce_heuristic_fallback() {
    let message = raw("From: MAILER-DAEMON@mail.example.net
To: sender@ourco.example
Subject: Mail delivery failed: returning message to sender
Date: Tue, 10 Feb 2026 08:00:00 +0000
X-Failed-Recipients: ghost@example.org

This message was created automatically by mail delivery software.

A message that you sent could not be delivered to one or more of its
recipients. This is a permanent error. The following address(es) failed:

  ghost@example.org
    host mx.example.org [192.0.2.1]
    SMTP error from remote mail server after RCPT TO:<ghost@example.org>:
    host mx.example.org said: 550 5.1.1 The email account does not exist

------ This is a copy of the message, including all the headers. ------
Subject: Hello there
");
    let record = parse_bounce(&message).expect("heuristic bounce should produce a record");
    assert_eq!(record.error_code.as_deref(), Some("550"));
    assert_eq!(record.error_message, "5.1.1 The email account does not exist");
    assert_eq!(record.to_addr, "ghost@example.org");
    assert_eq!(record.from_addr, "sender@ourco.example");
    assert_eq!(record.subject, "Hello there");
    assert!(record.delivery_status.is_empty());
}

#[test]
fn test_body_headers_of_crlf_message_are_trimmed() {
    // No To header: sender and subject come from the quoted original
    let message = raw("From: MAILER-DAEMON@mail.example.net
Subject: Mail delivery failed
Date: Tue, 10 Feb 2026 08:00:00 +0000

The following address failed:
  ghost@example.org
    550 5.1.1 The email account does not exist

------ This is a copy of the message, including all the headers. ------
From: Original Sender <sender@ourco.example>
Subject: Quarterly numbers \t
");
    assert!(message.bytes.windows(2).any(|w| w == b"\r\n"));
    let record = parse_bounce(&message).expect("heuristic bounce should produce a record");
    assert_eq!(record.subject, "Quarterly numbers");
    assert_eq!(record.from_addr, "sender@ourco.example");
}

#[test]
fn test_parse_bounce_heuristic_transient_only() {
    let message = raw("From: MAILER-DAEMON@mail.example.net
To: sender@ourco.example
Subject: Delivery Status Notification (Delay)
Date: Tue, 10 Feb 2026 08:00:00 +0000

Delivery to the following recipient has been delayed:
  slow@example.org
host mx.example.org said: 451 4.7.1 Greylisted, please retry
");
    assert_eq!(parse_bounce(&message), None);
}

#[test]
fn test_parse_bounce_html_notice() {
    let message = raw("From: postmaster@example.net
To: sender@ourco.example
Subject: Undeliverable: Meeting notes
Date: Tue, 10 Feb 2026 10:30:00 +0000
MIME-Version: 1.0
Content-Type: text/html; charset=utf-8

<html><head><style>.err { color: red; }</style></head>
<body><p class=\"err\">Delivery has failed to these recipients:</p>
<p>Recipient: lost@example.org</p>
<p>Remote server returned: smtp; 550 5.4.1 Recipient address rejected: Access denied</p>
</body></html>
");
    let record = parse_bounce(&message).expect("html bounce should produce a record");
    assert_eq!(record.error_code.as_deref(), Some("550"));
    assert_eq!(record.to_addr, "lost@example.org");
    assert_eq!(record.body_plain, "");
    assert!(record.body_html.starts_with("Delivery has failed"));
    assert!(!record.body_html.contains("color"));
    assert!(!record.body_html.contains('<'));
    assert_eq!(record.subject, "Undeliverable: Meeting notes");
}

#[test]
fn test_parse_bounce_empty_bodies() {
    let message = raw("From: MAILER-DAEMON@mx.example.org
To: sender@ourco.example
Subject: Undelivered Mail Returned to Sender
Date: Tue, 10 Feb 2026 09:15:00 +0000
MIME-Version: 1.0
Content-Type: multipart/report; report-type=delivery-status; boundary=\"B\"

--B
Content-Type: message/delivery-status

Reporting-MTA: dns; mx.example.org

Final-Recipient: rfc822; nobody@example.org
Action: failed
Status: 5.1.1

--B--
");
    let record = parse_bounce(&message).expect("status-only bounce should produce a record");
    assert_eq!(record.error_code, None);
    assert_eq!(record.error_message, "DSN status 5.1.1");
    assert_eq!(record.body_plain, "");
    assert_eq!(record.body_html, "");
    assert_eq!(record.body_plain_original, "");
    assert_eq!(record.body_html_original, "");
    assert_eq!(record.subject, "Undelivered Mail Returned to Sender");
}

#[test]
fn test_parse_bounce_excerpt_truncated() {
    let filler = "word ".repeat(600);
    let message = raw(&format!(
        "From: MAILER-DAEMON@mx.example.org
To: sender@ourco.example
Subject: Undeliverable
Date: Tue, 10 Feb 2026 09:15:00 +0000

smtp; 554 5.7.1 Message rejected
{filler}
"
    ));
    let record = parse_bounce(&message).expect("bounce");
    assert_eq!(record.body_plain.chars().count(), MAX_BODY_EXCERPT_CHARS);
    assert!(!record.body_plain.contains('\n'));
}

#[test]
fn test_parse_bounce_date_falls_back_to_received() {
    let mut message = raw("From: MAILER-DAEMON@mx.example.org
To: sender@ourco.example
Subject: Returned mail

smtp; 550 5.1.1 unknown user
");
    message.received = DateTime::parse_from_rfc3339("2026-02-10T11:12:13+01:00").ok();
    let record = parse_bounce(&message).expect("bounce");
    assert_eq!(record.date, "2026-02-10 11:12:13");
}

#[test]
fn test_try_parse_bounces_malformed() {
    let message = RawMessage::new("Junk", 9, Vec::new());
    assert_eq!(
        try_parse_bounces(&message),
        Err(ParseError::Malformed {
            folder: "Junk".to_string(),
            uid: 9
        })
    );
    assert_eq!(parse_bounce(&message), None);
}

#[test]
fn test_is_permanent_failure() {
    let mut record = parse_bounce(&raw(&dsn_bounce(&[(
        "nobody@example.org",
        "5.1.1",
        "550 unknown",
    )])))
    .expect("bounce");
    assert!(record.is_permanent_failure());
    record.error_code = Some("450".to_string());
    assert!(!record.is_permanent_failure());
    record.error_code = None;
    assert!(record.is_permanent_failure());
    record.delivery_status.clear();
    assert!(!record.is_permanent_failure());
}
