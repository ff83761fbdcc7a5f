use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{self, AppState};
use crate::images::{MAX_IMAGE_SIZE, UPLOAD_URL_PREFIX};
use crate::middleware::{require_admin, require_auth};
use crate::{admin, comments, recipes, saved};

/// Room for the text fields of a multipart recipe next to a full-size image.
const BODY_LIMIT: usize = MAX_IMAGE_SIZE + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/recipes/search", get(recipes::search_recipes))
        .route("/api/recipes/titles", get(recipes::recipe_titles))
        .route("/api/recipes/{id}", get(recipes::get_recipe));

    let protected_routes = Router::new()
        .route("/api/recipes", post(recipes::create_recipe))
        .route("/api/recipes/user", get(recipes::my_recipes))
        .route("/api/recipes/saved", get(saved::list_saved))
        .route("/api/recipes/save/{id}", post(saved::toggle_save))
        .route("/api/recipes/{id}", put(recipes::update_recipe))
        .route("/api/recipes/{id}", delete(recipes::delete_recipe))
        .route("/api/recipes/{id}/isSaved", get(saved::is_saved))
        .route("/api/recipes/{id}/comments", post(comments::add_comment))
        .route("/api/recipes/{id}/comments/{comment_id}", delete(comments::delete_comment))
        .route("/api/recipes/{id}/comments/{comment_id}/report", post(comments::report_comment))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/ban", put(admin::toggle_disable))
        .route("/reported-comments", get(admin::reported_comments))
        .route("/recipes", get(admin::list_recipes))
        .route("/recipes/{id}", delete(admin::delete_recipe))
        .route("/recipes/{id}/comments/{comment_id}", delete(admin::delete_comment))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let uploads = ServeDir::new(state.images.dir());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/api/admin", admin_routes)
        .nest_service(UPLOAD_URL_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
