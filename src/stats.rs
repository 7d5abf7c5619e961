use crate::error::{AnalyzerError, Result};
use crate::parser::{LineParser, ParsedLine};
use serde::Serialize;
use std::collections::HashMap;
use std::io::BufRead;
use tracing::{debug, info};

/// Limits for one aggregation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationOptions {
    /// Stop after this many lines have been read (bounded/debug runs)
    pub max_lines: Option<u64>,
    /// Maximum share of not-parsed lines, in percent of lines read
    pub error_limit_percent: f64,
}

/// Timing statistics for one URL, as consumed by the report template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlStat {
    pub url: String,
    pub count: u64,
    pub count_perc: f64,
    pub time_avg: f64,
    pub time_max: f64,
    pub time_med: f64,
    pub time_sum: f64,
    pub time_perc: f64,
}

/// Round to 3 decimal places, halves away from zero
///
/// Scaling by 1000 rounds once more, so a value written as 1.0005 (stored as
/// 1.000499999...) still rounds up to 1.001 like the decimal it was parsed from.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Median of an ascending slice; mean of the two middle values for even lengths
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[derive(Default)]
struct AggregationRun {
    lines_processed: u64,
    lines_parsed: u64,
    not_parsed: u64,
    total_time: f64,
    url_times: HashMap<String, Vec<f64>>,
}

impl AggregationRun {
    fn record(&mut self, url: String, request_time: f64) {
        self.url_times.entry(url).or_default().push(request_time);
        self.total_time += request_time;
        self.lines_parsed += 1;
    }

    fn check_error_budget(&self, limit: f64) -> Result<()> {
        if self.lines_processed == 0 {
            return Ok(());
        }

        // Cross-multiplied so a share exactly at the limit is not pushed over it
        if self.not_parsed as f64 * 100.0 > limit * self.lines_processed as f64 {
            return Err(AnalyzerError::BudgetExceeded {
                not_parsed: self.not_parsed,
                processed: self.lines_processed,
                limit,
            });
        }

        Ok(())
    }

    fn into_stats(self) -> Vec<UrlStat> {
        let lines_parsed = self.lines_parsed as f64;
        let total_time = self.total_time;

        let mut stats: Vec<UrlStat> = self
            .url_times
            .into_iter()
            .map(|(url, mut times)| {
                times.sort_by(f64::total_cmp);

                let count = times.len() as u64;
                // Summed in sorted order so the result does not depend on line order
                let time_sum: f64 = times.iter().sum();
                let time_perc = if total_time > 0.0 {
                    time_sum / total_time * 100.0
                } else {
                    0.0
                };

                UrlStat {
                    url,
                    count,
                    count_perc: round3(count as f64 / lines_parsed * 100.0),
                    time_avg: round3(time_sum / count as f64),
                    time_max: round3(times[times.len() - 1]),
                    time_med: round3(median(&times)),
                    time_sum: round3(time_sum),
                    time_perc: round3(time_perc),
                }
            })
            .collect();

        stats.sort_by(|a, b| {
            b.time_sum
                .total_cmp(&a.time_sum)
                .then_with(|| a.url.cmp(&b.url))
        });

        stats
    }
}

/// Read the whole line source and build per-URL statistics, slowest first
///
/// A line that is not valid UTF-8 aborts the run at once. Lines that do not
/// match the request grammar are counted, and the run fails afterwards if
/// their share exceeds `options.error_limit_percent`.
pub fn collect_statistics<R: BufRead>(
    mut reader: R,
    parser: &LineParser,
    options: &AggregationOptions,
) -> Result<Vec<UrlStat>> {
    let mut run = AggregationRun::default();
    let mut line_buffer = Vec::with_capacity(2048);

    loop {
        if options.max_lines.is_some_and(|cap| run.lines_processed >= cap) {
            info!(max_lines = run.lines_processed, "Line cap reached, stopping early");
            break;
        }

        line_buffer.clear();
        let line_number = run.lines_processed + 1;
        let bytes_read = reader
            .read_until(b'\n', &mut line_buffer)
            .map_err(|source| AnalyzerError::Read { line_number, source })?;

        if bytes_read == 0 {
            break;
        }
        run.lines_processed = line_number;

        match parser.parse_line(&line_buffer) {
            ParsedLine::Success { url, request_time } => run.record(url, request_time),
            ParsedLine::NotParsed => {
                let line = String::from_utf8_lossy(&line_buffer);
                debug!(line_number, line = %line.trim_end(), "Line not parsed");
                run.not_parsed += 1;
            }
            ParsedLine::DecodeError => {
                let line = String::from_utf8_lossy(&line_buffer).trim_end().to_string();
                return Err(AnalyzerError::Decode { line_number, line });
            }
        }
    }

    info!(
        lines_processed = run.lines_processed,
        lines_parsed = run.lines_parsed,
        not_parsed = run.not_parsed,
        urls = run.url_times.len(),
        "Log lines read"
    );

    run.check_error_budget(options.error_limit_percent)?;

    if run.lines_parsed == 0 {
        return Err(AnalyzerError::NothingParsed);
    }

    Ok(run.into_stats())
}
