//! Text view of a day's reports.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use strum::IntoEnumIterator;

use super::{AccountReport, DayView, ReportRecord};
use crate::classify::{Category, Disposition};
use crate::error_handling::UnknownCategoryError;

/// Which records of a day to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    /// Categories to keep; every category by default
    pub categories: BTreeSet<Category>,
    /// Accounts to keep; empty keeps all
    pub accounts: BTreeSet<String>,
    /// Show addresses, subject, folder, date and body of each record
    pub detail: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            categories: Category::iter().collect(),
            accounts: BTreeSet::new(),
            detail: false,
        }
    }
}

impl ReportFilter {
    /// Builds a filter from comma-split CLI values.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategoryError` for the first label that is not a
    /// category.
    pub fn from_args(
        categories: &[String],
        accounts: &[String],
        detail: bool,
    ) -> Result<Self, UnknownCategoryError> {
        let categories: BTreeSet<Category> = categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::parse::<Category>)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            categories: if categories.is_empty() {
                Category::iter().collect()
            } else {
                categories
            },
            accounts: accounts
                .iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            detail,
        })
    }

    fn keeps_account(&self, account: &str) -> bool {
        self.accounts.is_empty() || self.accounts.contains(account)
    }

    /// Records without a readable category are kept only by the unfiltered
    /// default.
    fn keeps_record(&self, record: &ReportRecord) -> bool {
        match record.category() {
            Some(category) => self.categories.contains(&category),
            None => self.categories.len() == Category::iter().count(),
        }
    }

    /// Applies the filter, keeping every selected account even when none of
    /// its records match.
    pub fn apply(&self, view: &DayView) -> DayView {
        let mut filtered = DayView::new(view.date);
        for (account, report) in &view.accounts {
            if !self.keeps_account(account) {
                continue;
            }
            let keep = |records: &[ReportRecord]| {
                records
                    .iter()
                    .filter(|r| self.keeps_record(r))
                    .cloned()
                    .collect::<Vec<_>>()
            };
            filtered.accounts.insert(
                account.clone(),
                AccountReport {
                    target: keep(&report.target),
                    excluded: keep(&report.excluded),
                },
            );
        }
        filtered
    }
}

/// Renders an already filtered view as plain text.
pub fn render_text(view: &DayView, filter: &ReportFilter) -> String {
    let date = view.date.format("%Y-%m-%d");
    if view.accounts.is_empty() {
        return format!("No report files found for {date}\n");
    }

    let mut out = String::new();
    let _ = writeln!(out, "Bounce report {date}");
    for (account, report) in &view.accounts {
        let _ = writeln!(out);
        let _ = writeln!(out, "[{account}]");
        for disposition in [Disposition::Target, Disposition::Excluded] {
            let records = report.records(disposition);
            let title = match disposition {
                Disposition::Target => "Target",
                Disposition::Excluded => "Excluded",
            };
            let _ = writeln!(out, "  {title} ({})", records.len());
            if records.is_empty() {
                let _ = writeln!(out, "    No records");
            }
            for record in records {
                render_record(&mut out, record, filter.detail);
            }
        }
    }

    if view.total_records() == 0 {
        let categories: Vec<&str> = filter.categories.iter().map(Category::as_str).collect();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "No matching records for {date} (categories: {})",
            categories.join(", ")
        );
    }
    out
}

fn render_record(out: &mut String, record: &ReportRecord, detail: bool) {
    let code = record.error_code.as_deref().unwrap_or("---");
    let _ = writeln!(out, "    {code} {}", record.error_message);
    let category = record
        .category()
        .map(|c| format!("{} ({})", c.as_str(), c.label()))
        .unwrap_or_else(|| "unknown".to_string());
    let _ = writeln!(out, "      Category: {category}");
    if !record.ai_responsible_party.is_empty() && record.ai_category.is_some() {
        let _ = writeln!(out, "      Responsible: {}", record.ai_responsible_party);
    }
    if !record.ai_reason.is_empty() {
        let _ = writeln!(out, "      Reason: {}", record.ai_reason);
    }
    if detail {
        let _ = writeln!(out, "      Date: {}", record.date);
        let _ = writeln!(out, "      Folder: {}", record.folder);
        let _ = writeln!(out, "      From: {}", record.from_addr);
        let _ = writeln!(out, "      To: {}", record.to_addr);
        let _ = writeln!(out, "      Subject: {}", record.subject);
        if !record.body_plain.is_empty() {
            let _ = writeln!(out, "      Body: {}", record.body_plain);
        }
    }
}
