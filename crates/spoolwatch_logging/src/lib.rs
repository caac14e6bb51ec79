//! Shared logging utilities for spoolwatch binaries and tests.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "spoolwatch=info,spoolwatch_protocol=info";
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Logging configuration shared by spoolwatch entry points.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file-level filter to the console instead of warn-and-up.
    pub verbose: bool,
}

/// Initialize tracing with a size-capped file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = SharedLogWriter::new(log_dir, config.app_name)
        .context("Failed to initialize log writer")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(())
}

/// Get the spoolwatch home directory: ~/.spoolwatch
pub fn spoolwatch_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("SPOOLWATCH_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".spoolwatch")
}

/// Get the logs directory: ~/.spoolwatch/logs
pub fn logs_dir() -> PathBuf {
    spoolwatch_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Append-only log file capped at [`MAX_LOG_FILE_SIZE`]. When the cap is
/// reached the current file is renamed to `<name>.log.old` (replacing any
/// previous one) and a fresh file is started.
struct LogFile {
    dir: PathBuf,
    base_name: String,
    file: File,
    current_size: u64,
}

impl LogFile {
    fn open(dir: PathBuf, base_name: &str) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let base_name = sanitize_name(base_name);
        let (file, size) = Self::open_at(&dir, &base_name)?;
        let mut log = Self {
            dir,
            base_name,
            file,
            current_size: size,
        };
        if log.current_size > MAX_LOG_FILE_SIZE {
            log.rotate()?;
        }
        Ok(log)
    }

    fn open_at(dir: &PathBuf, base_name: &str) -> io::Result<(File, u64)> {
        let path = dir.join(format!("{base_name}.log"));
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    fn rotate(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        let current = self.dir.join(format!("{}.log", self.base_name));
        let old = self.dir.join(format!("{}.log.old", self.base_name));
        if current.exists() {
            fs::rename(&current, &old)?;
        }
        let (file, size) = Self::open_at(&self.dir, &self.base_name)?;
        self.file = file;
        self.current_size = size;
        Ok(())
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current_size + buf.len() as u64 > MAX_LOG_FILE_SIZE {
            self.rotate()?;
        }
        let bytes = self.file.write(buf)?;
        self.current_size += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[derive(Clone)]
struct SharedLogWriter {
    inner: Arc<Mutex<LogFile>>,
}

impl SharedLogWriter {
    fn new(dir: PathBuf, base_name: &str) -> Result<Self> {
        let file = LogFile::open(dir, base_name)
            .with_context(|| format!("Failed to open log file for {base_name}"))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

struct SharedLogWriterGuard {
    inner: Arc<Mutex<LogFile>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogWriter {
    type Writer = SharedLogWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedLogWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.flush()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
