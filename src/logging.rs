// src/logging.rs
//! Logging context: console layer plus a size-rotated file layer.
//!
//! Nothing is configured at load time. `init` is called once from `main` and the
//! returned guard flushes the log file when it goes out of scope.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::core::config_manager::LogConfig;

pub const LOG_FILE_NAME: &str = "console.log";

/// Keeps the file writer alive for the lifetime of the process
pub struct LoggingGuard {
    writer: RotatingFileWriter,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        let _ = self.writer.flush_inner();
    }
}

fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    for target in ["chromiumoxide", "async_nats", "hyper", "hyper_util", "reqwest", "tungstenite"] {
        directives.push(format!("{}=warn", target));
    }

    let filter = directives.join(",");
    EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter '{}'", filter))
}

/// Install the global subscriber. Call once, at process start.
pub fn init(config: &LogConfig) -> Result<LoggingGuard> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create log directory: {}", config.dir.display()))?;

    let writer = RotatingFileWriter::open(
        config.dir.join(LOG_FILE_NAME),
        config.max_bytes,
        config.backup_count,
    )?;

    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_target(false)
        .with_filter(build_env_filter(&config.level)?);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer.clone())
        .with_filter(build_env_filter(&config.level)?);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Logging was already initialized")?;

    tracing::debug!(
        "Logging initialized: level={}, file={}, max_bytes={}, backups={}",
        config.level,
        config.dir.join(LOG_FILE_NAME).display(),
        config.max_bytes,
        config.backup_count
    );

    Ok(LoggingGuard { writer })
}

// ===== Size-Rotated File Writer =====

/// Appends to `path`; once a write would push the file past `max_bytes` the file
/// is shifted to `path.1` (older backups to `.2` .. `.backup_count`) and a fresh
/// file is started.
#[derive(Clone)]
pub struct RotatingFileWriter {
    state: Arc<Mutex<RotatingState>>,
}

struct RotatingState {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backup_count: usize,
}

impl RotatingFileWriter {
    pub fn open(path: PathBuf, max_bytes: u64, backup_count: usize) -> Result<Self> {
        let file = open_append(&path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            state: Arc::new(Mutex::new(RotatingState {
                path,
                file,
                size,
                max_bytes,
                backup_count,
            })),
        })
    }

    fn flush_inner(&self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.file.flush()
    }
}

impl RotatingState {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.max_bytes > 0 && self.size > 0 && self.size + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backup_count == 0 {
            self.file = File::create(&self.path)?;
            self.size = 0;
            return Ok(());
        }

        let oldest = backup_path(&self.path, self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.backup_count).rev() {
            let from = backup_path(&self.path, n);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, n + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;

        self.file = open_append(&self.path).map_err(io::Error::other)?;
        self.size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", n));
    PathBuf::from(name)
}

pub struct RotatingHandle {
    state: Arc<Mutex<RotatingState>>,
}

impl Write for RotatingHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingHandle {
            state: Arc::clone(&self.state),
        }
    }
}
