use identity_service::{
    build_router,
    config::IdentityConfig,
    db,
    services::{
        ChallengeService, ContextService, IdentityService, JwtService, RedisChallengeStore,
        TenancyService,
    },
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    // Relational store
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database initialized successfully");

    // Challenge store
    let store = RedisChallengeStore::new(&config.redis.url).await?;
    let challenges = ChallengeService::new(
        Arc::new(store),
        config.challenge.domain.clone(),
        config.challenge.ttl_seconds,
    );
    tracing::info!("Challenge store initialized");

    // Token issuance
    let jwt = JwtService::new(&config.jwt);
    tracing::info!("JWT service initialized");

    // Rate limiters
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let signup_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.signup_attempts,
        config.rate_limit.signup_window_seconds,
    );
    let challenge_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.challenge_attempts,
        config.rate_limit.challenge_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login, Signup, Challenge, and Global IP");

    // Core services
    let identity = IdentityService::new(pool.clone(), challenges.clone());
    let tenancy = TenancyService::new(pool.clone());
    let context = ContextService::new(tenancy.clone(), jwt.clone());

    let state = AppState {
        config: config.clone(),
        pool,
        challenges,
        jwt,
        identity,
        tenancy,
        context,
        login_rate_limiter,
        signup_rate_limiter,
        challenge_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
