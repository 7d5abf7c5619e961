use crate::error::{AnalyzerError, Result};
use crate::stats::UrlStat;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Report file name for a log date, e.g. report-2017.06.30.html
pub fn report_file_name(date: NaiveDate) -> String {
    format!("report-{}.html", date.format("%Y.%m.%d"))
}

/// Where the report for `date` should be written, or None when it already exists
pub fn report_path<P: AsRef<Path>>(report_dir: P, date: NaiveDate) -> Option<PathBuf> {
    let path = report_dir.as_ref().join(report_file_name(date));

    if path.exists() {
        info!(report = %path.display(), "Report already exists");
        None
    } else {
        info!(report = %path.display(), "Report will be written");
        Some(path)
    }
}

/// Substitute `$table_json` / `${table_json}` in the template and unescape
/// `$$` to `$`, leaving any other `$` text alone
fn render_template(template: &str, table_json: &str) -> String {
    let placeholder = Regex::new(r"\$(?:(\$)|\{table_json\}|table_json\b)").unwrap();
    placeholder
        .replace_all(template, |caps: &Captures| {
            if caps.get(1).is_some() {
                "$".to_string()
            } else {
                table_json.to_string()
            }
        })
        .into_owned()
}

/// Render the first `report_size` statistics into the template and write the report
///
/// The report is written to a temp file next to the target and renamed into
/// place, so a failed run never leaves a partial report behind.
pub fn render_report(
    template_path: &Path,
    report_path: &Path,
    stats: &[UrlStat],
    report_size: usize,
) -> Result<()> {
    let render_error = |reason: String| AnalyzerError::Render {
        path: report_path.to_path_buf(),
        reason,
    };

    let template = std::fs::read_to_string(template_path).map_err(|e| {
        render_error(format!("cannot read template {}: {}", template_path.display(), e))
    })?;

    let top = &stats[..stats.len().min(report_size)];
    let table_json = serde_json::to_string(top)
        .map_err(|e| render_error(format!("cannot serialize statistics: {}", e)))?;

    let html = render_template(&template, &table_json);

    let parent_dir = report_path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .map_err(|e| render_error(format!("cannot create report directory: {}", e)))?;

    // Use tempfile for automatic cleanup on error
    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .map_err(|e| render_error(format!("cannot create temp file: {}", e)))?;
    temp_file
        .write_all(html.as_bytes())
        .and_then(|_| temp_file.flush())
        .map_err(|e| render_error(format!("cannot write report: {}", e)))?;

    // Close the handle before the rename so it also works on Windows
    let temp_path = temp_file.into_temp_path();
    temp_path
        .persist(report_path)
        .map_err(|e| render_error(format!("cannot move report into place: {}", e.error)))?;

    info!(report = %report_path.display(), rows = top.len(), "Report generated");
    Ok(())
}
