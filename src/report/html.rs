//! Standalone HTML report (Bootstrap 5 from the CDN).

use std::fmt::Write as _;

use chrono::{Local, NaiveDate};

use super::{AccountReport, DayView, ReportRecord};

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";
const BOOTSTRAP_JS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js";

const TABLE_HEADERS: &[&str] = &[
    "Date", "Code", "Message", "Category", "Reason", "From", "To", "Subject", "Body",
];

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders `view` as a complete HTML document.
pub fn render_html(date: NaiveDate, view: &DayView) -> String {
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    render_html_at(date, view, &generated)
}

fn render_html_at(date: NaiveDate, view: &DayView, generated: &str) -> String {
    let date = escape_html(&date.format("%Y-%m-%d").to_string());
    let mut sections = String::new();
    for (account, report) in &view.accounts {
        sections.push_str(&account_section(account, report));
    }
    if view.accounts.is_empty() {
        sections.push_str("<p class=\"text-muted\">No report files for this date</p>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Bounce Report {date}</title>
<link href="{BOOTSTRAP_CSS}" rel="stylesheet" crossorigin="anonymous">
</head>
<body>
<div class="container py-4">
<h1>Bounce Report <small class="text-muted">{date}</small></h1>
<p class="text-muted">Generated: {generated}</p>
{sections}</div>
<div class="modal fade" id="bodyModal" tabindex="-1">
<div class="modal-dialog modal-lg">
<div class="modal-content">
<div class="modal-header">
<h5 class="modal-title">Body</h5>
<button type="button" class="btn-close" data-bs-dismiss="modal"></button>
</div>
<div class="modal-body">
<pre id="bodyContent" class="mb-0" style="white-space:pre-wrap;word-break:break-word;"></pre>
</div>
</div>
</div>
</div>
<script src="{BOOTSTRAP_JS}" crossorigin="anonymous"></script>
<script>
document.getElementById("bodyModal").addEventListener("show.bs.modal",function(e){{
document.getElementById("bodyContent").textContent=e.relatedTarget.getAttribute("data-body");
}});
</script>
</body>
</html>
"#,
        generated = escape_html(generated),
    )
}

fn account_section(account: &str, report: &AccountReport) -> String {
    format!(
        r#"<div class="card mb-4">
<div class="card-header"><h2 class="mb-0">{account}</h2></div>
<div class="card-body">
<h3>Target <span class="badge bg-danger">{target_count}</span></h3>
{target}
<h3 class="mt-4">Excluded <span class="badge bg-secondary">{excluded_count}</span></h3>
{excluded}
</div>
</div>
"#,
        account = escape_html(account),
        target_count = report.target.len(),
        target = records_table(&report.target),
        excluded_count = report.excluded.len(),
        excluded = records_table(&report.excluded),
    )
}

fn records_table(records: &[ReportRecord]) -> String {
    if records.is_empty() {
        return "<p class=\"text-muted\">No records</p>".to_string();
    }

    let mut rows = String::new();
    for record in records {
        let category = record
            .category()
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| record.ai_responsible_party.clone());
        let cells = [
            record.date.as_str(),
            record.error_code.as_deref().unwrap_or(""),
            record.error_message.as_str(),
            category.as_str(),
            record.ai_reason.as_str(),
            record.from_addr.as_str(),
            record.to_addr.as_str(),
            record.subject.as_str(),
        ];
        rows.push_str("<tr>");
        for cell in cells {
            let _ = write!(rows, "<td>{}</td>", escape_html(cell));
        }
        let body = if record.body_plain.is_empty() {
            &record.body_html
        } else {
            &record.body_plain
        };
        if body.is_empty() {
            rows.push_str("<td></td>");
        } else {
            let _ = write!(
                rows,
                "<td><button class=\"btn btn-sm btn-outline-secondary\" data-bs-toggle=\"modal\" \
                 data-bs-target=\"#bodyModal\" data-body=\"{}\">View</button></td>",
                escape_html(body)
            );
        }
        rows.push_str("</tr>\n");
    }

    let headers: String = TABLE_HEADERS
        .iter()
        .map(|h| format!("<th>{h}</th>"))
        .collect();
    format!(
        "<div class=\"table-responsive\">\n<table class=\"table table-sm table-hover\">\n\
         <thead><tr>{headers}</tr></thead>\n<tbody>\n{rows}</tbody>\n</table>\n</div>"
    )
}
