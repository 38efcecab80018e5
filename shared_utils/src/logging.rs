//! Logging Module - 统一的日志系统
//!
//! 基于 tracing 的日志系统：
//! - 控制台输出到 stderr（经过进度条 suspend，不会与进度条交错）
//! - `--verbose` 时控制台为 INFO，否则 WARN；`RUST_LOG` 可覆盖
//! - 可选日志文件：INFO 级别，无 ANSI，每次运行截断
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{LogConfig, init_logging};
//! use tracing::info;
//!
//! let _guard = init_logging(LogConfig::new().with_verbose(true)).expect("Failed to initialize logging");
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::unified_progress::ProgressAwareStderr;

/// 日志配置结构
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// 控制台是否输出 INFO 级别
    pub verbose: bool,
    /// 日志文件路径（None 表示不写文件）
    pub log_file: Option<PathBuf>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_log_file<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        self.log_file = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    /// 控制台日志级别
    pub fn console_level(&self) -> Level {
        if self.verbose {
            Level::INFO
        } else {
            Level::WARN
        }
    }
}

/// Keeps the non-blocking file writer alive; dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 初始化日志系统
///
/// 只能成功调用一次（全局 subscriber）。返回的 guard 需要保持到程序结束。
pub fn init_logging(config: LogConfig) -> Result<LoggingGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level().as_str().to_lowercase()));

    let console_layer = fmt::layer()
        .with_writer(|| ProgressAwareStderr)
        .with_ansi(true)
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, file_guard) = match config.log_file.as_deref() {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                crate::common_utils::ensure_dir_exists(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(true)
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        verbose = config.verbose,
        log_file = ?config.log_file,
        "Logging system initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
