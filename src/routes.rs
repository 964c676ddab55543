// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, certificates, exams, user},
    state::AppState,
    utils::jwt::auth_middleware,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Public routes: login and registration.
/// * Everything else sits behind `auth_middleware`.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/check", get(auth::check))
                .layer(auth.clone()),
        );

    let exam_routes = Router::new()
        .route("/available", get(exams::list_available))
        .route("/current", get(exams::current))
        .route("/submit", post(exams::submit))
        .route("/{id}", get(exams::get_exam))
        .layer(auth.clone());

    let certificate_routes = Router::new()
        .route("/", get(certificates::list_mine))
        .route("/search", get(certificates::search))
        .route("/{id}", get(certificates::get_certificate))
        .layer(auth.clone());

    let user_routes = Router::new()
        .route("/stats", get(user::stats))
        .layer(auth);

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/register", post(auth::register))
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/certificates", certificate_routes)
        .nest("/api/user", user_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
