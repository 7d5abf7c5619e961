use crate::error::{AnalyzerError, Result};
use crate::log_discovery::DEFAULT_LOG_PREFIX;
use crate::stats::AggregationOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./config/config.json";

/// Builds an HTML report of the slowest URLs from the latest nginx access log
#[derive(clap::Parser, Debug)]
#[command(name = "log_analyzer")]
#[command(about = "Reports the slowest URLs of the latest nginx access log")]
pub struct Args {
    /// Path to the JSON config; its keys override the built-in defaults
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Effective configuration: built-in defaults overlaid with the JSON file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub log_dir: PathBuf,
    pub log_prefix: String,
    pub report_dir: PathBuf,
    pub template_path: PathBuf,
    pub report_size: usize,
    pub errors_limit_perc: f64,
    pub self_log_path: Option<PathBuf>,
    pub debug_mode: bool,
    pub test_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./log"),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            report_dir: PathBuf::from("./reports"),
            template_path: PathBuf::from("./reports/report.html"),
            report_size: 100,
            errors_limit_perc: 5.0,
            self_log_path: None,
            debug_mode: false,
            test_size: 1000,
        }
    }
}

/// What happened while loading, reported once logging is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    DefaultsOnly,
}

impl Config {
    /// Parse a JSON document; keys it leaves out keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| AnalyzerError::Config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file at `path`
    ///
    /// A missing file is only tolerated at the default location, in which case
    /// the built-in defaults are used as they are.
    pub fn load(path: &Path) -> Result<(Self, ConfigSource)> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok((Self::from_json(&json)?, ConfigSource::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && path == Path::new(DEFAULT_CONFIG_PATH) => {
                Ok((Self::default(), ConfigSource::DefaultsOnly))
            }
            Err(e) => Err(AnalyzerError::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.report_size == 0 {
            return Err(AnalyzerError::Config("REPORT_SIZE must be positive".to_string()));
        }
        if self.test_size == 0 {
            return Err(AnalyzerError::Config("TEST_SIZE must be positive".to_string()));
        }
        if !(0.0..=100.0).contains(&self.errors_limit_perc) {
            return Err(AnalyzerError::Config(format!(
                "ERRORS_LIMIT_PERC must be within 0..=100, got {}",
                self.errors_limit_perc
            )));
        }
        Ok(())
    }

    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            max_lines: self.debug_mode.then_some(self.test_size),
            error_limit_percent: self.errors_limit_perc,
        }
    }
}
