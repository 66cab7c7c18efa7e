//! Classified bounce reports.
//!
//! This module provides:
//! - [`ReportRecord`], the persisted form of a classified bounce
//! - Per-account partitioning into target and excluded records
//! - Daily JSON artifacts with duplicate-free appends (`store`)
//! - Text and HTML views of one day across accounts

mod html;
mod render;
mod store;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::classify::{Category, Classification, Disposition};
use crate::parse::BounceRecord;

pub use html::{escape_html, render_html};
pub use render::{render_text, ReportFilter};
pub use store::{
    append_records, artifact_path, html_report_path, load_day, remove_day, write_account_report,
};

/// A classified bounce as stored in the daily artifacts.
///
/// Field order is the artifact's key order. Unknown or missing fields of
/// older artifacts are tolerated when loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRecord {
    pub date: String,
    pub folder: String,
    pub error_code: Option<String>,
    pub error_message: String,
    #[serde(deserialize_with = "lenient_category")]
    pub ai_category: Option<Category>,
    pub ai_responsible_party: String,
    pub ai_reason: String,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: String,
    pub body_plain: String,
    pub body_html: String,
    pub body_plain_original: String,
    pub body_html_original: String,
    pub delivery_status: BTreeMap<String, String>,
}

impl ReportRecord {
    pub fn new(record: BounceRecord, classification: Classification) -> Self {
        Self {
            date: record.date,
            folder: record.folder,
            error_code: record.error_code,
            error_message: record.error_message,
            ai_category: Some(classification.category),
            ai_responsible_party: classification.responsible_party,
            ai_reason: classification.reason,
            from_addr: record.from_addr,
            to_addr: record.to_addr,
            subject: record.subject,
            body_plain: record.body_plain,
            body_html: record.body_html,
            body_plain_original: record.body_plain_original,
            body_html_original: record.body_html_original,
            delivery_status: record.delivery_status,
        }
    }

    /// Category of the record.
    ///
    /// Older artifacts carry no `ai_category` and stored the category label in
    /// `ai_responsible_party`; it is recovered from there.
    pub fn category(&self) -> Option<Category> {
        self.ai_category
            .or_else(|| self.ai_responsible_party.parse().ok())
    }
}

/// Unrecognized category labels load as `None` instead of failing the file.
fn lenient_category<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label.and_then(|label| label.parse().ok()))
}

/// Target and excluded records of one account, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountReport {
    pub target: Vec<ReportRecord>,
    pub excluded: Vec<ReportRecord>,
}

impl AccountReport {
    /// Appends `record` to the sequence of its category's disposition.
    pub fn push(&mut self, record: ReportRecord) {
        match record.category().map(|c| c.disposition()) {
            Some(Disposition::Excluded) => self.excluded.push(record),
            // Records without a readable category need a look
            Some(Disposition::Target) | None => self.target.push(record),
        }
    }

    pub fn records(&self, disposition: Disposition) -> &[ReportRecord] {
        match disposition {
            Disposition::Target => &self.target,
            Disposition::Excluded => &self.excluded,
        }
    }

    pub fn len(&self) -> usize {
        self.target.len() + self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty() && self.excluded.is_empty()
    }

    /// Record count per category; uncategorized records are not counted.
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for record in self.target.iter().chain(&self.excluded) {
            if let Some(category) = record.category() {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Partitions classified records into target and excluded, preserving order.
pub fn partition(records: impl IntoIterator<Item = ReportRecord>) -> AccountReport {
    let mut report = AccountReport::default();
    for record in records {
        report.push(record);
    }
    report
}

/// All reports of one day, keyed by account name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub date: NaiveDate,
    pub accounts: BTreeMap<String, AccountReport>,
}

impl DayView {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            accounts: BTreeMap::new(),
        }
    }

    pub fn total_records(&self) -> usize {
        self.accounts.values().map(AccountReport::len).sum()
    }
}
