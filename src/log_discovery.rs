use crate::error::{AnalyzerError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix nginx gives the rotated UI access logs
pub const DEFAULT_LOG_PREFIX: &str = "nginx-access-ui.log";

/// Represents a discovered log file with the date encoded in its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub is_compressed: bool,
}

impl LogFile {
    /// Parse a file name against `<prefix>-YYYYMMDD[.gz]`
    /// Examples (prefix = "nginx-access-ui.log"):
    ///   - nginx-access-ui.log-20170630    -> date = 2017-06-30, is_compressed = false
    ///   - nginx-access-ui.log-20170630.gz -> date = 2017-06-30, is_compressed = true
    ///   - nginx-access-ui.log-20170630.bz2 -> None
    ///   - nginx-access-ui.log-20171340    -> None (not a calendar date)
    fn from_file_name(dir: &Path, file_name: &str, pattern: &Regex) -> Option<Self> {
        let captures = pattern.captures(file_name)?;

        let date = NaiveDate::parse_from_str(captures.get(1)?.as_str(), "%Y%m%d").ok()?;
        let is_compressed = captures.get(2).is_some();

        Some(LogFile {
            path: dir.join(file_name),
            date,
            is_compressed,
        })
    }
}

impl PartialOrd for LogFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogFile {
    /// Newer date sorts greater; on the same day the name that sorts first wins
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| other.path.cmp(&self.path))
    }
}

fn file_name_pattern(prefix: &str) -> Regex {
    // Prefix is escaped, so the only variable parts are the date and the optional .gz
    Regex::new(&format!(r"^{}-(\d{{8}})(\.gz)?$", regex::escape(prefix)))
        .expect("escaped prefix always forms a valid pattern")
}

/// Find the log file with the latest date in its name
/// Returns Ok(None) when nothing in the directory matches
pub fn find_latest_log<P: AsRef<Path>>(log_directory: P, prefix: &str) -> Result<Option<LogFile>> {
    let log_dir = log_directory.as_ref();
    info!(log_dir = %log_dir.display(), "Searching for logs");

    let filesystem_error = |source| AnalyzerError::Filesystem {
        path: log_dir.to_path_buf(),
        source,
    };

    let pattern = file_name_pattern(prefix);

    // Collect names first so the scan order does not depend on the filesystem
    let mut file_names = Vec::new();
    for entry in std::fs::read_dir(log_dir).map_err(filesystem_error)? {
        let entry = entry.map_err(filesystem_error)?;

        if !entry.path().is_file() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            file_names.push(name.to_string());
        }
    }
    file_names.sort();

    let mut latest: Option<LogFile> = None;
    for name in &file_names {
        let Some(candidate) = LogFile::from_file_name(log_dir, name, &pattern) else {
            debug!(file = %name, "Skipping non-matching file");
            continue;
        };

        // Strictly greater: the first file seen for a given date wins
        if latest.as_ref().map_or(true, |current| candidate > *current) {
            latest = Some(candidate);
        }
    }

    match &latest {
        Some(log) => info!(
            path = %log.path.display(),
            date = %log.date,
            compressed = log.is_compressed,
            "Latest log found"
        ),
        None => info!(log_dir = %log_dir.display(), "No log file found"),
    }

    Ok(latest)
}
