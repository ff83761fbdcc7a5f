//! Moderation endpoints. Mounted behind `require_auth` + `require_admin`.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
};
use tracing::info;
use uuid::Uuid;

use dishcovery_types::api::{Claims, MessageResponse, ReportedComment, ToggleDisableResponse};
use dishcovery_types::models::{Recipe, User};

use crate::auth::AppState;
use crate::comments::remove_comment;
use crate::convert::{parse_id, parse_timestamp, user_from_row, user_summary};
use crate::error::ApiError;
use crate::extract::PathParams;
use crate::recipes::{hydrate, remove_recipe};
use crate::run_db;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = run_db(&state, |db| {
        let mut saved: HashMap<String, Vec<Uuid>> = HashMap::new();
        for (user_id, recipe_id) in db.saved_pairs()? {
            saved.entry(user_id).or_default().push(parse_id(&recipe_id, "recipe"));
        }

        Ok(db
            .list_users()?
            .into_iter()
            .map(|row| {
                let saved_recipes = saved.remove(&row.id).unwrap_or_default();
                user_from_row(row, saved_recipes)
            })
            .collect::<Vec<_>>())
    })
    .await?;
    Ok(Json(users))
}

pub async fn toggle_disable(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(user_id): PathParams<Uuid>,
) -> Result<Json<ToggleDisableResponse>, ApiError> {
    let uid = user_id.to_string();
    let is_disabled = run_db(&state, move |db| db.toggle_user_disabled(&uid))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    info!(
        "Admin {} {} user {}",
        claims.sub,
        if is_disabled { "disabled" } else { "enabled" },
        user_id
    );
    let msg = if is_disabled { "User disabled" } else { "User enabled" };
    Ok(Json(ToggleDisableResponse {
        msg: msg.into(),
        is_disabled,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(user_id): PathParams<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let uid = user_id.to_string();
    run_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(&uid)? else {
            return Ok(Err(ApiError::NotFound("User not found")));
        };
        if user.admin {
            return Ok(Err(ApiError::Forbidden("Cannot delete an admin account")));
        }
        db.delete_user(&uid)?;
        Ok(Ok(()))
    })
    .await??;

    info!("Admin {} deleted user {}", claims.sub, user_id);
    Ok(Json(MessageResponse::new("User deleted")))
}

pub async fn reported_comments(State(state): State<AppState>) -> Result<Json<Vec<ReportedComment>>, ApiError> {
    let rows = run_db(&state, |db| db.reported_comments()).await?;
    let reported = rows
        .into_iter()
        .map(|row| {
            let c = row.comment;
            ReportedComment {
                recipe_id: parse_id(&c.recipe_id, "recipe"),
                recipe_title: row.recipe_title,
                comment_id: parse_id(&c.id, "comment"),
                author: user_summary(&c.author_id, c.author_username),
                created_at: parse_timestamp(&c.created_at),
                body: c.body,
                rating: c.rating,
            }
        })
        .collect();
    Ok(Json(reported))
}

pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = run_db(&state, |db| {
        let rows = db.list_recipes()?;
        hydrate(db, rows)
    })
    .await?;
    Ok(Json(recipes))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(recipe_id): PathParams<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    remove_recipe(&state, recipe_id).await?;
    info!("Admin {} deleted recipe {}", claims.sub, recipe_id);
    Ok(Json(MessageResponse::new("Recipe deleted successfully")))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((recipe_id, comment_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    remove_comment(&state, recipe_id, comment_id).await?;
    info!("Admin {} deleted comment {} on recipe {}", claims.sub, comment_id, recipe_id);
    Ok(Json(MessageResponse::new("Comment deleted")))
}
