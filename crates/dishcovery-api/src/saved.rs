use axum::{
    Extension, Json,
    extract::State,
};
use tracing::info;
use uuid::Uuid;

use dishcovery_types::api::{Claims, IsSavedResponse, ToggleSaveResponse};
use dishcovery_types::models::Recipe;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::PathParams;
use crate::recipes::hydrate;
use crate::run_db;

pub async fn toggle_save(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(recipe_id): PathParams<Uuid>,
) -> Result<Json<ToggleSaveResponse>, ApiError> {
    let (uid, rid) = (claims.sub.to_string(), recipe_id.to_string());
    let saved = run_db(&state, move |db| {
        // tokens outlive deleted accounts
        if db.get_user_by_id(&uid)?.is_none() {
            return Ok(Err(ApiError::NotFound("User not found")));
        }
        Ok(db
            .toggle_saved(&uid, &rid)?
            .ok_or(ApiError::NotFound("Recipe not found")))
    })
    .await??;

    info!(
        "User {} {} recipe {}",
        claims.sub,
        if saved { "saved" } else { "unsaved" },
        recipe_id
    );
    let msg = if saved { "Recipe saved" } else { "Recipe unsaved" };
    Ok(Json(ToggleSaveResponse {
        saved,
        msg: msg.into(),
    }))
}

pub async fn is_saved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(recipe_id): PathParams<Uuid>,
) -> Result<Json<IsSavedResponse>, ApiError> {
    let (uid, rid) = (claims.sub.to_string(), recipe_id.to_string());
    let is_saved = run_db(&state, move |db| db.is_saved(&uid, &rid)).await?;
    Ok(Json(IsSavedResponse { is_saved }))
}

pub async fn list_saved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let uid = claims.sub.to_string();
    let recipes = run_db(&state, move |db| {
        let rows = db.list_saved_recipes(&uid)?;
        hydrate(db, rows)
    })
    .await?;
    Ok(Json(recipes))
}
