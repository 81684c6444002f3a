use crate::config::settings::{LogFileSettings, LogFormat, LoggingSettings};
use crate::utils::error::{ApiError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 終端用的簡單 subscriber；服務啟動前也用它暫時接住設定載入的日誌
pub fn cli_subscriber(verbose: bool) -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("personal_finance_api=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("personal_finance_api=info"))
    };

    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    )
}

pub fn init_cli_logger(verbose: bool) {
    // 已有全域 subscriber 時保留原本的
    let _ = cli_subscriber(verbose).try_init();
}

/// 依設定初始化日誌：終端輸出（compact 或 JSON），加上可選的輪替檔案
pub fn init_service_logger(settings: &LoggingSettings, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { settings.level.as_str() };
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("personal_finance_api={},tower_http=info,warn", level))
    });

    let console = match settings.format {
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .compact()
            .boxed(),
        // 正式環境用 JSON 方便收集
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .boxed(),
    };

    let file_layer = match &settings.file {
        Some(file) => Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(RotatingFileWriter::open(file)?)
                .with_filter(EnvFilter::new(&file.level)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| ApiError::ConfigError {
            message: format!("Failed to initialise logging: {}", e),
        })
}

/// 依大小輪替的日誌檔，備份命名為 `<path>.1`、`<path>.2`…
#[derive(Clone)]
pub struct RotatingFileWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    file: File,
    size: u64,
}

impl RotatingFileWriter {
    pub fn open(settings: &LogFileSettings) -> Result<Self> {
        let path = PathBuf::from(&settings.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            inner: Arc::new(Mutex::new(RotatingFile {
                path,
                max_bytes: settings.max_bytes,
                backup_count: settings.backup_count,
                file,
                size,
            })),
        })
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

impl RotatingFile {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backup_count == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.size = 0;
            return Ok(());
        }

        for index in (1..self.backup_count).rev() {
            let from = backup_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;

        self.file = open_append(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;

        if inner.size > 0 && inner.size + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        inner.file.write_all(buf)?;
        inner.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        inner.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
