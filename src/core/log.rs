use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter,
};

/// 日志文件目录与文件名前缀（按天滚动，如 logs/civicsync.log.2026-10-16）
const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "civicsync.log";

/// 初始化日志：控制台 + 按天滚动的文件。
///
/// 返回的 guard 必须一直持有，drop 之后文件写入线程会停止。
pub fn init(log_level: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 文件层：不带颜色，保留代码位置和线程ID，方便排查并发下的限流与投票问题
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true);

    // RUST_LOG 写错时退回 info，而不是让进程起不来
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|e| {
        eprintln!("⚠️ Invalid log filter {log_level:?}: {e}, falling back to info");
        EnvFilter::new("info")
    });

    registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
