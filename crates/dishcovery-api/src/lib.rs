pub mod admin;
pub mod auth;
pub mod comments;
pub mod convert;
pub mod error;
pub mod extract;
pub mod images;
pub mod middleware;
pub mod payload;
pub mod recipes;
pub mod router;
pub mod saved;
pub mod tags;

use tracing::error;

use dishcovery_db::Database;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use router::build_router;

/// Run a blocking DB call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}
