// logging.rs — 日志初始化
// 同时输出到 stderr 和数据目录下按天滚动的日志文件

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_DIR: &str = "logs";

/// 初始化日志；RUST_LOG 优先，其次由 debug 开关决定 info 或 debug
///
/// 返回的 guard 需要一直持有到程序退出，否则文件日志可能丢失。
pub fn init(data_dir: &Path, debug: bool) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        // 终端只显示警告以上，避免和命令输出混在一起
        .with_filter(if debug { LevelFilter::DEBUG } else { LevelFilter::WARN });

    let log_dir = data_dir.join(LOG_DIR);
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&log_dir, "app.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
