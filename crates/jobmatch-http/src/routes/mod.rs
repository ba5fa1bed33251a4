//! API route definitions

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::server::AppState;

/// Create the versioned API router.
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Vacancies
        .route("/vacancies", post(handlers::create_vacancy))
        .route("/vacancies", get(handlers::list_vacancies))
        .route("/vacancies/:id", get(handlers::get_vacancy))
        .route("/vacancies/:id", put(handlers::update_vacancy))
        .route("/vacancies/:id", delete(handlers::delete_vacancy))
        // Profiles
        .route("/profiles", post(handlers::create_profile))
        .route("/profiles", get(handlers::list_profiles))
        .route("/profiles/:id", get(handlers::get_profile))
        .route("/profiles/:id", put(handlers::update_profile))
        .route("/profiles/:id", delete(handlers::delete_profile))
        // Profile sub-resources
        .route("/profiles/:id/experiences", post(handlers::create_experience))
        .route("/profiles/:id/experiences", get(handlers::list_experiences))
        .route("/profiles/:id/experiences/:item_id", delete(handlers::delete_experience))
        .route("/profiles/:id/projects", post(handlers::create_project))
        .route("/profiles/:id/projects", get(handlers::list_projects))
        .route("/profiles/:id/projects/:item_id", delete(handlers::delete_project))
        .route("/profiles/:id/achievements", post(handlers::create_achievement))
        .route("/profiles/:id/achievements", get(handlers::list_achievements))
        .route("/profiles/:id/achievements/:item_id", delete(handlers::delete_achievement))
        .route("/profiles/:id/education", post(handlers::create_education))
        .route("/profiles/:id/education", get(handlers::list_education))
        .route("/profiles/:id/education/:item_id", delete(handlers::delete_education))
        .route("/profiles/:id/certificates", post(handlers::create_certificate))
        .route("/profiles/:id/certificates", get(handlers::list_certificates))
        .route("/profiles/:id/certificates/:item_id", delete(handlers::delete_certificate))
        .route("/profiles/:id/skills", post(handlers::create_skill))
        .route("/profiles/:id/skills", get(handlers::list_skills))
        .route("/profiles/:id/skills/:item_id", delete(handlers::delete_skill))
        .route("/profiles/:id/languages", post(handlers::create_language))
        .route("/profiles/:id/languages", get(handlers::list_languages))
        .route("/profiles/:id/languages/:item_id", delete(handlers::delete_language))
        .route("/profiles/:id/links", post(handlers::create_link))
        .route("/profiles/:id/links", get(handlers::list_links))
        .route("/profiles/:id/links/:item_id", delete(handlers::delete_link))
        // Document versions
        .route("/profiles/:id/resume-versions", post(handlers::create_resume_version))
        .route("/profiles/:id/resume-versions", get(handlers::list_resume_versions))
        .route(
            "/profiles/:id/resume-versions/:item_id/approve",
            post(handlers::approve_resume_version),
        )
        .route(
            "/profiles/:id/cover-letter-versions",
            post(handlers::create_cover_letter_version),
        )
        .route(
            "/profiles/:id/cover-letter-versions",
            get(handlers::list_cover_letter_versions),
        )
        .route(
            "/profiles/:id/cover-letter-versions/:item_id/approve",
            post(handlers::approve_cover_letter_version),
        )
        // Imports and saved searches
        .route("/import/hh", post(handlers::start_import))
        .route("/saved-searches", post(handlers::create_saved_search))
        .route("/saved-searches", get(handlers::list_saved_searches))
        .route("/saved-searches/:id", patch(handlers::update_saved_search))
        .route("/saved-searches/:id", delete(handlers::delete_saved_search))
        .route("/saved-searches/:id/sync", post(handlers::sync_saved_search))
        // Matching
        .route(
            "/profiles/:id/recommendations",
            get(handlers::get_recommendations),
        )
        .route(
            "/profiles/:id/recommendations/recompute",
            post(handlers::recompute_recommendations),
        )
        .route(
            "/profiles/:id/vacancies/:vacancy_id/tailoring",
            get(handlers::get_tailoring),
        )
        // Task result store
        .route("/tasks/:task_id", get(handlers::get_task_status))
        // Health and version
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

/// Create the full application router with the `/api/v1` prefix.
pub fn create_app(state: Arc<AppState>) -> Router {
    let enable_cors = state.http.enable_cors;
    let enable_tracing = state.http.enable_tracing;

    let mut app = Router::new()
        .nest("/api/v1", api_routes(state))
        .fallback(handlers::fallback_not_found);

    if enable_tracing {
        app = app.layer(TraceLayer::new_for_http());
    }
    if enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    app
}
