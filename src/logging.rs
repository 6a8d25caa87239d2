//! 文件日志（终端被 TUI 占用，日志只写文件）。
//!
//! 同一进程只初始化一次；重复调用同一目录是幂等的，换目录会被拒绝。

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;

const LOG_FILE_BASENAME: &str = "askbank";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: PathBuf,
    _logger: LoggerHandle,
}

pub fn init_logging(level: &str, log_dir: &Path) -> Result<()> {
    let level = normalize_level(level)?;
    if let Some(state) = LOGGING_STATE.get() {
        return check_same(state, level, log_dir);
    }

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState> {
        std::fs::create_dir_all(log_dir)
            .map_err(|err| anyhow!("创建日志目录失败 `{}`: {err}", log_dir.display()))?;
        let logger = Logger::try_with_str(level)
            .map_err(|err| anyhow!("无效的日志级别 `{level}`: {err}"))?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| anyhow!("启动日志失败: {err}"))?;

        log::info!(
            "event=app_start status=ok version={} level={} log_dir={}",
            env!("CARGO_PKG_VERSION"),
            level,
            log_dir.display()
        );
        Ok(LoggingState {
            level,
            log_dir: log_dir.to_path_buf(),
            _logger: logger,
        })
    })?;
    check_same(state, level, log_dir)
}

fn check_same(state: &LoggingState, level: &str, log_dir: &Path) -> Result<()> {
    if state.log_dir != log_dir {
        return Err(anyhow!(
            "日志已在 `{}` 初始化，拒绝切换到 `{}`",
            state.log_dir.display(),
            log_dir.display()
        ));
    }
    if state.level != level {
        return Err(anyhow!(
            "日志级别已是 `{}`，拒绝切换到 `{}`",
            state.level,
            level
        ));
    }
    Ok(())
}

pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(anyhow!(
            "不支持的日志级别 `{other}`，可选 trace|debug|info|warn|error"
        )),
    }
}
