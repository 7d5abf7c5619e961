use crate::error::{AnalyzerError, Result};
use crate::log_discovery::LogFile;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Unified log file reader that wraps plain and gzip files
/// All variants implement BufRead through dynamic dispatch
pub struct LogFileReader {
    inner: Box<dyn BufRead>,
}

impl LogFileReader {
    /// Opens a discovered log file, picking the decoder from the descriptor
    pub fn open(log: &LogFile) -> Result<Self> {
        let file = File::open(&log.path).map_err(|source| AnalyzerError::Open {
            path: log.path.clone(),
            source,
        })?;

        // 512KB is large enough for good I/O throughput on multi-GB logs
        const BUFFER_SIZE: usize = 512 * 1024;

        // logrotate may concatenate gzip members, so decode all of them
        let reader: Box<dyn BufRead> = if log.is_compressed {
            Box::new(BufReader::with_capacity(BUFFER_SIZE, MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::with_capacity(BUFFER_SIZE, file))
        };

        Ok(LogFileReader { inner: reader })
    }

    /// Get the underlying BufRead trait object for generic operations
    pub fn as_buf_read(&mut self) -> &mut dyn BufRead {
        &mut *self.inner
    }
}
