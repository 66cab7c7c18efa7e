//! Daily JSON artifacts.
//!
//! Each processed account gets two files per day in the log directory:
//! `{YYYYMMDD}_{account}_target.json` and `{YYYYMMDD}_{account}_excluded.json`,
//! each a JSON array of [`ReportRecord`]s.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use tokio::fs;

use super::{AccountReport, DayView, ReportRecord};
use crate::classify::Disposition;
use crate::error_handling::ReportIoError;
use crate::utils::{compact, write_atomic};

static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{8})_(.+)_(target|excluded)\.json$")
        .expect("Failed to compile artifact name regex - this is a bug")
});

/// Path of an account's artifact for `date`.
pub fn artifact_path(
    log_dir: &Path,
    date: NaiveDate,
    account: &str,
    disposition: Disposition,
) -> PathBuf {
    log_dir.join(format!(
        "{}_{account}_{}.json",
        compact(date),
        disposition.as_str()
    ))
}

/// Path of the rendered HTML report for `date`.
pub fn html_report_path(report_dir: &Path, date: NaiveDate) -> PathBuf {
    report_dir.join(format!("report_{}.html", compact(date)))
}

/// Appends `records` to the artifact at `path`, skipping records already
/// present. The file is created (possibly as `[]`) if it does not exist.
///
/// Returns the number of records added.
///
/// # Errors
///
/// Returns a `ReportIoError` if the existing file cannot be read or is not a
/// JSON array, or if the new content cannot be written.
pub async fn append_records(path: &Path, records: &[ReportRecord]) -> Result<usize, ReportIoError> {
    let io_error = |source| ReportIoError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json_error = |source| ReportIoError::Json {
        path: path.to_path_buf(),
        source,
    };

    let mut existing: Vec<Value> = match fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Vec::new(),
        Ok(content) => serde_json::from_str(&content).map_err(json_error)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(io_error(e)),
    };

    let mut added = 0;
    for record in records {
        let value = serde_json::to_value(record).map_err(json_error)?;
        if !existing.contains(&value) {
            existing.push(value);
            added += 1;
        }
    }

    let content = serde_json::to_vec_pretty(&existing).map_err(json_error)?;
    write_atomic(path, &content).await.map_err(io_error)?;
    Ok(added)
}

/// Writes both artifacts of an account for `date`.
///
/// Returns the number of target and excluded records added.
///
/// # Errors
///
/// Returns the first `ReportIoError` encountered.
pub async fn write_account_report(
    log_dir: &Path,
    date: NaiveDate,
    account: &str,
    report: &AccountReport,
) -> Result<(usize, usize), ReportIoError> {
    let mut added = [0; 2];
    for (slot, disposition) in [Disposition::Target, Disposition::Excluded]
        .into_iter()
        .enumerate()
    {
        let path = artifact_path(log_dir, date, account, disposition);
        added[slot] = append_records(&path, report.records(disposition)).await?;
        log::info!(
            "Report: {} ({} record(s), {} new)",
            path.display(),
            report.records(disposition).len(),
            added[slot]
        );
    }
    Ok((added[0], added[1]))
}

/// Artifact files of `date` in `log_dir`, sorted by name, with their account
/// and disposition.
async fn day_artifacts(
    log_dir: &Path,
    date: NaiveDate,
) -> std::io::Result<Vec<(PathBuf, String, Disposition)>> {
    let prefix = compact(date);
    let mut entries = match fs::read_dir(log_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(caps) = ARTIFACT_NAME.captures(&name) else {
            continue;
        };
        if caps[1] != prefix {
            continue;
        }
        let disposition = if &caps[3] == "target" {
            Disposition::Target
        } else {
            Disposition::Excluded
        };
        found.push((entry.path(), caps[2].to_string(), disposition));
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

/// Reads every artifact of `date`, grouped by account.
///
/// Unreadable or invalid files are logged and skipped.
pub async fn load_day(log_dir: &Path, date: NaiveDate) -> DayView {
    let mut view = DayView::new(date);
    let artifacts = match day_artifacts(log_dir, date).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            log::warn!("Failed to list {}: {e}", log_dir.display());
            return view;
        }
    };

    for (path, account, disposition) in artifacts {
        let records: Vec<ReportRecord> = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("Failed to read {}: {e}", path.display());
                    continue;
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {e}", path.display());
                continue;
            }
        };
        let report = view.accounts.entry(account).or_default();
        match disposition {
            Disposition::Target => report.target.extend(records),
            Disposition::Excluded => report.excluded.extend(records),
        }
    }
    view
}

/// Deletes every artifact of `date`. Returns the deleted paths.
///
/// # Errors
///
/// Returns a `ReportIoError` if the directory cannot be listed or a file
/// cannot be removed.
pub async fn remove_day(log_dir: &Path, date: NaiveDate) -> Result<Vec<PathBuf>, ReportIoError> {
    let artifacts = day_artifacts(log_dir, date)
        .await
        .map_err(|source| ReportIoError::Io {
            path: log_dir.to_path_buf(),
            source,
        })?;

    let mut removed = Vec::with_capacity(artifacts.len());
    for (path, _, _) in artifacts {
        fs::remove_file(&path)
            .await
            .map_err(|source| ReportIoError::Io {
                path: path.clone(),
                source,
            })?;
        log::info!("Deleted {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}
