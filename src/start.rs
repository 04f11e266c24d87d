// src/start.rs
use std::{net::SocketAddr, sync::Arc, time::Duration};

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use secrecy::ExposeSecret;
use tokio::{net::TcpListener, signal};

use crate::{
    core::{config::Config, log},
    routes,
    services::vote::VoteToggle,
    state::AppState,
    stores::{postgres::SeaOrmVoteStore, redis::RedisCounterStore},
    utils::limiter::RateLimiter,
};

/// 启动服务。
///
/// 顺序：配置 → 日志 → Postgres（并执行迁移）→ Redis → 组装存储与限流器 → 监听端口。
/// 任何一步失败都直接退出进程，服务不会以残缺状态对外提供接口。
pub async fn run() {
    let config = Config::new();

    // guard 必须活到进程结束，否则文件日志会丢尾部
    let _guard = log::init(&config.rust_log);
    tracing::info!("🔍 Config loaded.");

    let mut opt = ConnectOptions::new(config.database_url.expose_secret());
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("❌ Failed to connect to Database");
    tracing::info!("✅ Database connected.");

    Migrator::up(&db, None)
        .await
        .expect("❌ Failed to run database migrations");
    tracing::info!("✅ Migrations applied.");

    let client =
        redis::Client::open(config.redis_url.expose_secret()).expect("❌ Invalid Redis URL");
    let redis_manager = client
        .get_connection_manager()
        .await
        .expect("❌ Failed to connect to Redis");
    tracing::info!("✅ Redis connected.");

    let deadline = config.store_timeout();
    let limiter = RateLimiter::new(Arc::new(RedisCounterStore::new(redis_manager)), deadline);
    let votes = VoteToggle::new(Arc::new(SeaOrmVoteStore::new(db.clone())), deadline);

    let policy = config.issue_rate_policy();
    tracing::info!(
        namespace = %policy.namespace,
        limit = policy.limit,
        window_secs = policy.window.as_secs(),
        "Issue creation rate limit configured"
    );

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .expect("❌ Invalid address configuration");

    let state = AppState::new(db, limiter, votes, config);
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .expect("❌ Failed to bind listen address");
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("❌ Server error");
}

/// 等待 Ctrl+C 或 SIGTERM，收到后让 axum 处理完在途请求再退出。
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Signal received, starting graceful shutdown...");
}
