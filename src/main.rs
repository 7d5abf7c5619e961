use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

mod config;
mod error;
mod log_discovery;
mod log_reader;
mod logging;
mod parser;
mod report;
mod stats;

use config::{Args, Config, ConfigSource};
use error::AnalyzerError;
use log_discovery::find_latest_log;
use log_reader::LogFileReader;
use parser::LineParser;
use stats::collect_statistics;

/// How a run that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum RunOutcome {
    NoLogFound,
    AlreadyReported,
    Generated(PathBuf),
}

/// Discover the latest log, aggregate it and write its report
fn run(config: &Config) -> Result<RunOutcome, AnalyzerError> {
    let Some(latest_log) = find_latest_log(&config.log_dir, &config.log_prefix)? else {
        return Ok(RunOutcome::NoLogFound);
    };

    let Some(report_path) = report::report_path(&config.report_dir, latest_log.date) else {
        return Ok(RunOutcome::AlreadyReported);
    };

    let stats = {
        // Reader (and its file handle) is dropped at the end of this block on every path
        let mut reader = LogFileReader::open(&latest_log)?;
        collect_statistics(
            reader.as_buf_read(),
            &LineParser::new(),
            &config.aggregation_options(),
        )?
    };

    report::render_report(&config.template_path, &report_path, &stats, config.report_size)?;

    Ok(RunOutcome::Generated(report_path))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = match Config::load(&args.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            // No SELF_LOG_PATH to honour yet, so the failure goes to stdout
            logging::init_logging(None)?;
            error!(config = %args.config.display(), error = %e, "Failed to load config");
            std::process::exit(1);
        }
    };
    logging::init_logging(config.self_log_path.as_deref())?;

    info!(config = %args.config.display(), debug_mode = config.debug_mode, "Starting log analyzer");
    if source == ConfigSource::DefaultsOnly {
        warn!(config = %args.config.display(), "Config file not found, using defaults");
    }

    match run(&config) {
        Ok(RunOutcome::Generated(path)) => {
            info!(report = %path.display(), "Done");
            Ok(())
        }
        Ok(outcome) => {
            info!(?outcome, "Nothing to do");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Log analysis failed");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<html><script>var table = $table_json;</script></html>";

    fn log_line(url: &str, request_time: &str) -> String {
        format!(
            "1.199.4.96 - - [29/Jun/2017:03:50:22 +0300] \"GET {url} HTTP/1.1\" 200 2613 \"-\" \"Lynx/2.8.8\" \"-\" \"1498697422-3800516057-4708-9752745\" \"2a828197ae235b0b3cb\" {request_time}\n"
        )
    }

    struct Workspace {
        _root: TempDir,
        config: Config,
    }

    fn workspace() -> Workspace {
        let root = TempDir::new().unwrap();
        let log_dir = root.path().join("log");
        let report_dir = root.path().join("reports");
        fs::create_dir_all(&log_dir).unwrap();
        fs::create_dir_all(&report_dir).unwrap();
        let template_path = report_dir.join("report.html");
        fs::write(&template_path, TEMPLATE).unwrap();

        let config = Config {
            log_dir,
            report_dir,
            template_path,
            ..Config::default()
        };

        Workspace { _root: root, config }
    }

    fn write_gz(path: &std::path::Path, content: &str) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    #[test]
    fn test_generates_report_for_latest_log() {
        let ws = workspace();
        let log_dir = &ws.config.log_dir;
        fs::write(log_dir.join("nginx-access-ui.log-20170629"), log_line("/old", "9.000")).unwrap();
        write_gz(
            &log_dir.join("nginx-access-ui.log-20170630.gz"),
            &[log_line("/api/1", "0.500"), log_line("/api/2", "1.500")].concat(),
        );

        let outcome = run(&ws.config).unwrap();

        let expected = ws.config.report_dir.join("report-2017.06.30.html");
        assert_eq!(outcome, RunOutcome::Generated(expected.clone()));

        let html = fs::read_to_string(&expected).unwrap();
        assert!(html.starts_with("<html><script>var table = [{\"url\":\"/api/2\""));
        assert!(!html.contains("/old"));
        assert!(!html.contains("$table_json"));
    }

    #[test]
    fn test_second_run_does_no_work() {
        let ws = workspace();
        let log_path = ws.config.log_dir.join("nginx-access-ui.log-20170630");
        fs::write(&log_path, log_line("/api/1", "0.500")).unwrap();

        assert!(matches!(run(&ws.config).unwrap(), RunOutcome::Generated(_)));

        // A log that would now fail to parse proves nothing is read again
        fs::write(&log_path, b"\xff\xfe\n").unwrap();
        assert_eq!(run(&ws.config).unwrap(), RunOutcome::AlreadyReported);
    }

    #[test]
    fn test_no_log_found() {
        let ws = workspace();
        fs::write(ws.config.log_dir.join("unrelated.txt"), "x").unwrap();

        assert_eq!(run(&ws.config).unwrap(), RunOutcome::NoLogFound);
    }

    #[test]
    fn test_decode_error_writes_no_report() {
        let ws = workspace();
        let mut content = log_line("/api/1", "0.500").into_bytes();
        content.extend_from_slice(b"\xff\xfe\n");
        fs::write(ws.config.log_dir.join("nginx-access-ui.log-20170630"), content).unwrap();

        let err = run(&ws.config).unwrap_err();

        assert!(matches!(err, AnalyzerError::Decode { line_number: 2, .. }));
        assert!(!ws.config.report_dir.join("report-2017.06.30.html").exists());
    }

    #[test]
    fn test_corrupt_gzip_is_read_error() {
        let ws = workspace();
        let log_path = ws.config.log_dir.join("nginx-access-ui.log-20170630.gz");
        write_gz(&log_path, &log_line("/api/1", "0.500"));

        // First deflate block header right after the 10-byte gzip header:
        // BFINAL=1 with the reserved block type 11 is always invalid
        let mut bytes = fs::read(&log_path).unwrap();
        bytes[10] = 0b0000_0111;
        fs::write(&log_path, bytes).unwrap();

        let err = run(&ws.config).unwrap_err();

        assert!(matches!(err, AnalyzerError::Read { line_number: 1, .. }));
        assert!(!ws.config.report_dir.join("report-2017.06.30.html").exists());
    }

    #[test]
    fn test_budget_exceeded_writes_no_report() {
        let ws = workspace();
        let content = [log_line("/api/1", "0.500"), "garbage\n".to_string()].concat();
        fs::write(ws.config.log_dir.join("nginx-access-ui.log-20170630"), content).unwrap();

        let err = run(&ws.config).unwrap_err();

        assert!(matches!(err, AnalyzerError::BudgetExceeded { not_parsed: 1, processed: 2, .. }));
        assert!(!ws.config.report_dir.join("report-2017.06.30.html").exists());
    }

    #[test]
    fn test_missing_log_dir_is_error() {
        let mut ws = workspace();
        ws.config.log_dir = ws.config.log_dir.join("missing");

        assert!(matches!(run(&ws.config), Err(AnalyzerError::Filesystem { .. })));
    }
}
