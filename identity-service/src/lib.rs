pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::IdentityConfig;
use crate::services::{
    ChallengeService, ContextService, IdentityService, JwtService, TenancyService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::challenge::issue_challenge,
        handlers::auth::email::signup,
        handlers::auth::email::login,
        handlers::auth::wallet::verify_wallet,
        handlers::auth::wallet::link_wallet,
        handlers::context::switch_context,
        handlers::context::me,
        handlers::org::create_org,
        handlers::org::delete_org,
        handlers::org::create_workspace,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::SignupRequest,
            dtos::auth::LoginRequest,
            dtos::auth::ChallengeRequest,
            dtos::auth::ChallengeResponse,
            dtos::auth::WalletVerifyRequest,
            dtos::auth::WalletLinkRequest,
            dtos::auth::WalletLinkResponse,
            dtos::auth::SessionTokenResponse,
            dtos::auth::SwitchContextRequest,
            dtos::auth::SessionContextResponse,
            dtos::org::CreateOrganizationRequest,
            dtos::org::CreateOrganizationResponse,
            dtos::org::CreateWorkspaceRequest,
            models::UserResponse,
            models::OrganizationResponse,
            models::WorkspaceResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Email Authentication", description = "Password signup and login"),
        (name = "Wallet Authentication", description = "Challenge issuance, signature verification and identity linking"),
        (name = "Session", description = "Session context inspection and switching"),
        (name = "Tenancy", description = "Organization and workspace management"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub pool: PgPool,
    pub challenges: ChallengeService,
    pub jwt: JwtService,
    pub identity: IdentityService,
    pub tenancy: TenancyService,
    pub context: ContextService,
    pub login_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub signup_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub challenge_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Challenge issuance with its own limiter: nonce generation is
    // cheap but unauthenticated.
    let challenge_limiter = state.challenge_rate_limiter.clone();
    let challenge_route = Router::new()
        .route(
            "/auth/:chain/challenge",
            post(handlers::auth::issue_challenge),
        )
        .layer(from_fn_with_state(
            challenge_limiter,
            ip_rate_limit_middleware,
        ));

    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/email/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let signup_limiter = state.signup_rate_limiter.clone();
    let signup_route = Router::new()
        .route("/auth/email/signup", post(handlers::auth::signup))
        .layer(from_fn_with_state(signup_limiter, ip_rate_limit_middleware));

    // Routes that require a verified session context.
    let protected_routes = Router::new()
        .route("/auth/:chain/link", post(handlers::auth::link_wallet))
        .route(
            "/auth/context/switch",
            post(handlers::context::switch_context),
        )
        .route("/auth/me", get(handlers::context::me))
        .route("/orgs", post(handlers::org::create_org))
        .route("/orgs/:org_id", delete(handlers::org::delete_org))
        .route(
            "/orgs/:org_id/workspaces",
            post(handlers::org::create_workspace),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => state.config.swagger.enabled == config::SwaggerMode::Public,
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    app.route("/auth/:chain/verify", post(handlers::auth::verify_wallet))
        .merge(challenge_route)
        .merge(login_route)
        .merge(signup_route)
        .merge(protected_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Tracing span per request
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::health_check(&state.pool).await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        AppError::from(e)
    })?;

    state.challenges.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Challenge store health check failed");
        AppError::InternalError(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up",
            "challenge_store": "up"
        }
    })))
}
