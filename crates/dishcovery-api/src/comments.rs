use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use dishcovery_db::models::NewComment;
use dishcovery_types::api::{AddCommentRequest, Claims, MessageResponse};
use dishcovery_types::models::Comment;

use crate::auth::AppState;
use crate::convert::comment_from_row;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParams};
use crate::middleware::ensure_owner_or_admin;
use crate::run_db;

/// Accept integer ratings 1..=5, as numbers or numeric strings. Anything
/// else is dropped rather than clamped.
pub fn normalize_rating(value: Option<&Value>) -> Option<u8> {
    let rating = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (1..=5).contains(&rating).then_some(rating as u8)
}

enum AddOutcome {
    Added(Vec<Comment>),
    MissingRecipe,
    Disabled,
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(recipe_id): PathParams<Uuid>,
    JsonBody(req): JsonBody<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req
        .body
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());
    let rating = normalize_rating(req.rating.as_ref());
    if body.is_none() && rating.is_none() {
        return Err(ApiError::validation("A comment or a rating is required"));
    }

    let comment = NewComment {
        id: Uuid::new_v4().to_string(),
        recipe_id: recipe_id.to_string(),
        author_id: claims.sub.to_string(),
        body,
        rating,
    };
    let outcome = run_db(&state, move |db| {
        let Some(recipe) = db.get_recipe(&comment.recipe_id)? else {
            return Ok(AddOutcome::MissingRecipe);
        };
        if !recipe.record.comments_enabled {
            return Ok(AddOutcome::Disabled);
        }
        db.insert_comment(&comment)?;
        let comments = db.comments_for_recipe(&comment.recipe_id)?;
        Ok(AddOutcome::Added(comments.into_iter().map(comment_from_row).collect()))
    })
    .await?;

    match outcome {
        AddOutcome::Added(comments) => {
            info!("User {} commented on recipe {}", claims.sub, recipe_id);
            Ok((StatusCode::CREATED, Json(comments)))
        }
        AddOutcome::MissingRecipe => Err(ApiError::NotFound("Recipe not found")),
        AddOutcome::Disabled => Err(ApiError::Forbidden("Comments are disabled for this recipe")),
    }
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((recipe_id, comment_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (rid, cid) = (recipe_id.to_string(), comment_id.to_string());
    let comment = run_db(&state, move |db| {
        if db.get_recipe(&rid)?.is_none() {
            return Ok(Err(ApiError::NotFound("Recipe not found")));
        }
        Ok(db
            .get_comment(&rid, &cid)?
            .ok_or(ApiError::NotFound("Comment not found")))
    })
    .await??;

    ensure_owner_or_admin(&claims, &comment.author_id)?;
    remove_comment(&state, recipe_id, comment_id).await?;

    info!("Comment {} on recipe {} deleted by {}", comment_id, recipe_id, claims.sub);
    Ok(Json(MessageResponse::new("Comment deleted")))
}

pub async fn report_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((recipe_id, comment_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (rid, cid) = (recipe_id.to_string(), comment_id.to_string());
    let reported = run_db(&state, move |db| {
        if db.get_recipe(&rid)?.is_none() {
            return Ok(Err(ApiError::NotFound("Recipe not found")));
        }
        Ok(Ok(db.report_comment(&rid, &cid)?))
    })
    .await??;

    if !reported {
        return Err(ApiError::NotFound("Comment not found"));
    }
    info!("Comment {} reported by {}", comment_id, claims.sub);
    Ok(Json(MessageResponse::new("Comment reported")))
}

/// Delete without an ownership check. Shared with moderation.
pub(crate) async fn remove_comment(state: &AppState, recipe_id: Uuid, comment_id: Uuid) -> Result<(), ApiError> {
    let (rid, cid) = (recipe_id.to_string(), comment_id.to_string());
    let deleted = run_db(state, move |db| db.delete_comment(&rid, &cid)).await?;
    if !deleted {
        return Err(ApiError::NotFound("Comment not found"));
    }
    Ok(())
}
