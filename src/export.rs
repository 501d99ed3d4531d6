use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use crossbeam::channel::Receiver;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::sink::{LogEntry, MemoryLog};
use crate::status::RecorderStatus;

/// Complete session export (JSON-serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub status: RecorderStatus,
    pub log: Vec<String>,
}

impl SessionExport {
    pub fn from_log(status: RecorderStatus, log: &MemoryLog) -> Self {
        Self {
            status,
            log: log.entries().iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `jolt_log_2025-11-19_12-00-00.txt`
pub fn log_file_name(now: DateTime<Utc>, gzip: bool) -> String {
    let name = format!("jolt_log_{}.txt", now.format("%Y-%m-%d_%H-%M-%S"));
    if gzip {
        name + ".gz"
    } else {
        name
    }
}

/// Buffered file writer, gzip-compressed when requested.
pub fn open_log_writer(path: &Path, gzip: bool) -> io::Result<Box<dyn Write + Send>> {
    let file = BufWriter::new(File::create(path)?);
    if gzip {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(file))
    }
}

/// Write every entry received until all senders hang up. Returns the line count.
pub fn drain_log<W: Write>(rx: Receiver<LogEntry>, mut writer: W) -> io::Result<usize> {
    let mut lines = 0;
    for entry in rx {
        writeln!(writer, "{}", entry)?;
        lines += 1;
    }
    writer.flush()?;
    Ok(lines)
}
