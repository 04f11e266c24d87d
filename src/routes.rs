use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

// 自定义中间件模块重命名为 app_middleware，避免与 axum::middleware 冲突。
use crate::{handlers, middleware as app_middleware, state::AppState};

/// 创建应用程序路由器。
///
/// # 路由结构
/// 1. 认证路由 (`/api/auth/*`)：注册、登录公开；`/me` 需要令牌。
/// 2. 议题路由 (`/api/issue/*`)：全部需要令牌（由 `Claims` 提取器强制）。
///    - `/create` 额外挂载按用户的固定窗口限流中间件。
///    - `/vote/{id}` 为投票切换。
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me));

    // 只有创建议题走限流；限流中间件内部先完成鉴权再计数
    let create_issue = post(handlers::issues::create_issue).layer(middleware::from_fn_with_state(
        state.clone(),
        app_middleware::rate_limit::issue_rate_limiter,
    ));

    let issue_routes = Router::new()
        .route("/create", create_issue)
        .route("/issues", get(handlers::issues::list_issues))
        .route("/recent", get(handlers::issues::recent_issues))
        .route("/user/{user_id}", get(handlers::issues::issues_by_user))
        .route("/update/{id}", put(handlers::issues::update_issue))
        .route("/delete/{id}", delete(handlers::issues::delete_issue))
        .route("/vote/{id}", post(handlers::issues::vote_issue))
        .route("/{id}", get(handlers::issues::get_issue));

    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/issue", issue_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(state.config.client_url.as_deref()))
        .with_state(state)
}

/// 配置了前端地址时只放行该来源（允许携带凭据），否则全放行。
fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    let Some(origin) = client_url.and_then(|url| HeaderValue::from_str(url).ok()) else {
        return CorsLayer::permissive();
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH, header::RETRY_AFTER])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(12 * 3600))
}
