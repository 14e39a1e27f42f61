use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::api::openapi::ApiDoc;
use crate::config::{AppConfig, Environment};
use crate::database::DatabaseManager;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    jwt_auth_middleware, require_admin_middleware, response::PAGINATION_HEADER, validate_tenant_middleware,
    validate_user_middleware,
};

/// Shared application state handed to handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub databases: Arc<DatabaseManager>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let databases = DatabaseManager::new(
            config.database.clone(),
            config.security.admin.clone(),
            config.security.password_hash_cost,
        );
        Self {
            config: Arc::new(config),
            databases: Arc::new(databases),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/openapi.json", get(openapi))
        // Tier 1: tenant only
        .merge(public_routes(&state))
        // Tier 2: JWT + known user
        .merge(protected_routes(&state))
        // Tier 3: admin role
        .merge(elevated_routes(&state))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(public::login))
        .route("/api/users", post(public::register))
        .route_layer(from_fn_with_state(state.clone(), validate_tenant_middleware))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use protected::{attachments, categories, courses, quizzes, saved_courses, users};

    Router::new()
        // Users
        .route("/api/users/info", get(users::info))
        .route("/api/users/change-password", post(users::change_password))
        .route("/api/users/attachments/:id", post(users::upload_image))
        .route("/api/users/saved-course", get(saved_courses::list).post(saved_courses::toggle))
        .route("/api/users/:id", get(users::get).put(users::update))
        // Categories
        .route("/api/categories", get(categories::list))
        // Courses
        .route("/api/courses", get(courses::list).post(courses::create))
        .route("/api/courses/targets", post(courses::add_target))
        .route(
            "/api/courses/:id",
            get(courses::get).put(courses::update).delete(courses::delete),
        )
        .route("/api/courses/:id/targets", get(courses::targets))
        // Quizzes
        .route("/api/quizzes", get(quizzes::list).post(quizzes::create))
        .route("/api/quizzes/:id", get(quizzes::get).delete(quizzes::delete))
        .route("/api/quizzes/:id/check", post(quizzes::check))
        .route("/api/quizzes/:id/assets", post(quizzes::add_asset))
        // Attachments
        .route("/api/attachments", post(attachments::upload))
        .route("/api/attachments/:id", get(attachments::get))
        .route("/api/attachments/:id/content", get(attachments::download))
        // Layers run bottom-up: jwt, then tenant, then user
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn_with_state(state.clone(), validate_tenant_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn elevated_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/api/users", get(elevated::users::list))
        .route("/api/users/:id", delete(elevated::users::delete))
        .route("/api/categories", post(elevated::categories::create))
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn_with_state(state.clone(), validate_tenant_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let wildcard = config.security.cors_origins.iter().any(|o| o == "*");
    if config.environment == Environment::Development || wildcard {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(PAGINATION_HEADER)])
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Zamin Education API",
            "version": version,
            "description": "Multi-tenant education platform: users, courses, quizzes and attachments",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "docs": "/openapi.json (public)",
                "auth": "/api/auth/login (public - token acquisition)",
                "register": "POST /api/users (public)",
                "users": "/api/users/* (protected, listing and deletion require admin)",
                "categories": "/api/categories (protected, creation requires admin)",
                "courses": "/api/courses[/:id] (protected)",
                "quizzes": "/api/quizzes[/:id] (protected)",
                "attachments": "/api/attachments[/:id] (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.databases.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
