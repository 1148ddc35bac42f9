use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    auth::{Claims, TokenError, BUILTIN_ADMIN_ID},
    error::ApiError,
    models::{self, AdminRole},
    state::AppState,
};

/// Creates the complete middleware stack for the application
pub fn create_middleware_stack(
    request_timeout: Duration,
    allow_origin: &str,
) -> ServiceBuilder<
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            CorsLayer,
            tower::layer::util::Stack<
                TraceLayer<
                    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
                    DefaultMakeSpan,
                    DefaultOnRequest,
                    DefaultOnResponse,
                >,
                tower::layer::util::Identity,
            >,
        >,
    >,
> {
    ServiceBuilder::new()
        // Request/response logging with tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS configuration for the admin and public frontends
        .layer(create_cors_layer(allow_origin))
        .layer(TimeoutLayer::new(request_timeout))
}

/// Creates CORS layer configuration.
/// `allow_origin` is `*` or a comma-separated list of origins.
fn create_cors_layer(allow_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    if allow_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allow_origin
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

/// Initialize structured logging with JSON format
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    // Create environment filter for log levels
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Initialize tracing subscriber with JSON formatting
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
        )
        .try_init()?;

    tracing::info!("Structured logging initialized with JSON format");
    Ok(())
}

/// Verified token claims, placed in request extensions by `require_admin`.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub Claims);

/// Token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Guard for the admin API. Missing or invalid tokens are 401; a valid token
/// without an admin role is 403. Tokens of stored admins stop working as soon
/// as the account is deactivated or deleted.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let claims = state
        .auth
        .verify_token(token, models::now())
        .map_err(|e| match e {
            TokenError::Expired => ApiError::unauthorized("Token expired"),
            other => ApiError::unauthorized(format!("Invalid token: {}", other)),
        })?;

    if AdminRole::parse(&claims.role).is_none() {
        warn!("Rejected token for {} with role {}", claims.username, claims.role);
        return Err(ApiError::forbidden("Admin role required"));
    }

    if claims.sub != BUILTIN_ADMIN_ID {
        let active = state
            .store
            .find_admin_user(&claims.username)
            .await?
            .is_some_and(|user| user.id == claims.sub && user.is_active);
        if !active {
            warn!("Rejected token for inactive or removed admin {}", claims.username);
            return Err(ApiError::unauthorized("Account is no longer active"));
        }
    }

    request.extensions_mut().insert(AuthenticatedAdmin(claims));
    Ok(next.run(request).await)
}
