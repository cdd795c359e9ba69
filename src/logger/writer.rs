//! File writer for the logger

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::logger::config::FileConfig;
use crate::logger::error::LoggerError;

/// Shared log file writer.
///
/// After the first failed write the writer switches to stderr for the rest of the
/// process, so a full disk never takes logging down.
#[derive(Clone)]
pub struct LogFileWriter {
    state: Arc<Mutex<WriterState>>,
}

struct WriterState {
    file: BufWriter<File>,
    fallback_mode: bool,
}

impl LogFileWriter {
    pub fn new(config: &FileConfig) -> Result<Self, LoggerError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = open_log_file(&config.path, config.append)?;

        Ok(Self {
            state: Arc::new(Mutex::new(WriterState {
                file,
                fallback_mode: false,
            })),
        })
    }

    pub fn is_in_fallback_mode(&self) -> bool {
        self.state.lock().map(|s| s.fallback_mode).unwrap_or(false)
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileGuard {
            state: Arc::clone(&self.state),
        }
    }
}

/// Per-event handle returned by [`LogFileWriter::make_writer`].
pub struct LogFileGuard {
    state: Arc<Mutex<WriterState>>,
}

impl Write for LogFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("Failed to acquire writer lock"))?;

        if state.fallback_mode {
            return io::stderr().write(buf);
        }

        match state.file.write(buf) {
            Ok(written) => Ok(written),
            Err(e) => {
                state.fallback_mode = true;
                eprintln!("[Logger] File write failed, falling back to stderr: {}", e);
                io::stderr().write(buf)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("Failed to acquire writer lock"))?;

        if state.fallback_mode {
            return io::stderr().flush();
        }

        state.file.flush()
    }
}

impl Drop for LogFileGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            let _ = state.file.flush();
        }
    }
}

fn open_log_file(path: &Path, append: bool) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;

    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::LogFormat;
    use tempfile::TempDir;

    fn file_config(dir: &TempDir, append: bool) -> FileConfig {
        FileConfig {
            enabled: true,
            path: dir.path().join("nested").join("app.log"),
            append,
            format: LogFormat::Compact,
        }
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir, true);

        let writer = LogFileWriter::new(&config).unwrap();
        let mut guard = writer.make_writer();
        guard.write_all(b"hello\n").unwrap();
        drop(guard);

        let content = std::fs::read_to_string(&config.path).unwrap();
        assert_eq!(content, "hello\n");
        assert!(!writer.is_in_fallback_mode());
    }

    #[test]
    fn test_append_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir, true);

        for line in ["first\n", "second\n"] {
            let writer = LogFileWriter::new(&config).unwrap();
            let mut guard = writer.make_writer();
            guard.write_all(line.as_bytes()).unwrap();
        }

        let content = std::fs::read_to_string(&config.path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_truncate_discards_previous_content() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir, true);
        {
            let writer = LogFileWriter::new(&config).unwrap();
            writer.make_writer().write_all(b"old\n").unwrap();
        }

        let config = file_config(&dir, false);
        let writer = LogFileWriter::new(&config).unwrap();
        writer.make_writer().write_all(b"new\n").unwrap();

        let content = std::fs::read_to_string(&config.path).unwrap();
        assert_eq!(content, "new\n");
    }
}
