use regex::Regex;

/// Outcome of parsing one raw log line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Success { url: String, request_time: f64 },
    /// Line decoded fine but does not have the expected shape
    NotParsed,
    /// Line is not valid UTF-8
    DecodeError,
}

pub struct LineParser {
    request_regex: Regex,
}

impl LineParser {
    pub fn new() -> Self {
        // nginx "ui_short" format ends with $request_time:
        // $remote_addr $remote_user $http_x_real_ip [$time_local] "$request" $status $body_bytes_sent
        // "$http_referer" "$http_user_agent" "$http_x_forwarded_for" "$http_X_REQUEST_ID" "$http_X_RB_USER" $request_time
        let request_regex = Regex::new(
            r"(?:GET|POST|HEAD|PUT|OPTIONS|DELETE).(.*).HTTP/.* ([0-9]{1,6}[.][0-9]+)",
        )
        .unwrap();

        Self { request_regex }
    }

    pub fn parse_line(&self, raw: &[u8]) -> ParsedLine {
        let Ok(line) = std::str::from_utf8(raw) else {
            return ParsedLine::DecodeError;
        };
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(captures) = self.request_regex.captures(line) else {
            return ParsedLine::NotParsed;
        };

        // Both groups are mandatory in the pattern, and group 2 is always a plain decimal
        let url = captures[1].trim().to_string();
        match captures[2].parse::<f64>() {
            Ok(request_time) => ParsedLine::Success { url, request_time },
            Err(_) => ParsedLine::NotParsed,
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}
