use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use dishcovery_db::RecipeFilter;
use dishcovery_db::models::RecipeRow;
use dishcovery_types::api::{Claims, MessageResponse, RecipeTitle, SearchQuery};
use dishcovery_types::models::Recipe;

use crate::auth::AppState;
use crate::convert::{parse_id, recipe_from_row};
use crate::error::ApiError;
use crate::extract::{PathParams, QueryParams};
use crate::images::MAX_IMAGE_SIZE;
use crate::middleware::ensure_owner_or_admin;
use crate::payload::{RecipeChanges, RecipeDraft, RecipeForm, UploadedImage};
use crate::run_db;

pub async fn search_recipes(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let filter = RecipeFilter::from_query(&query);
    let recipes = run_db(&state, move |db| {
        let rows = db.search_recipes(&filter)?;
        hydrate(db, rows)
    })
    .await?;
    Ok(Json(recipes))
}

pub async fn recipe_titles(State(state): State<AppState>) -> Result<Json<Vec<RecipeTitle>>, ApiError> {
    let titles = run_db(&state, |db| db.recipe_titles()).await?;
    Ok(Json(
        titles
            .into_iter()
            .map(|(id, title)| RecipeTitle {
                id: parse_id(&id, "recipe"),
                title,
            })
            .collect(),
    ))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    PathParams(recipe_id): PathParams<Uuid>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = load_recipe(&state, recipe_id)
        .await?
        .ok_or(ApiError::NotFound("Recipe not found"))?;
    Ok(Json(recipe))
}

pub async fn my_recipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let uid = claims.sub.to_string();
    let recipes = run_db(&state, move |db| {
        let rows = db.list_recipes_by_creator(&uid)?;
        hydrate(db, rows)
    })
    .await?;
    Ok(Json(recipes))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    form: RecipeForm,
) -> Result<impl IntoResponse, ApiError> {
    let draft = RecipeDraft::from_fields(&form.fields)?;

    let image = match form.image {
        Some(upload) => Some(store_image(&state, claims.sub, upload).await?),
        None => None,
    };

    let recipe_id = Uuid::new_v4();
    let record = draft.into_record(recipe_id, claims.sub, image.clone());
    let inserted = run_db(&state, move |db| {
        db.insert_recipe(&record)?;
        let row = db
            .get_recipe(&record.id)?
            .ok_or_else(|| anyhow::anyhow!("recipe {} vanished after insert", record.id))?;
        Ok(recipe_from_row(row, Vec::new()))
    })
    .await;

    let recipe = match inserted {
        Ok(recipe) => recipe,
        Err(e) => {
            if let Some(path) = image {
                discard_image(&state, &path).await;
            }
            return Err(e);
        }
    };

    info!("Recipe '{}' ({}) created by {}", recipe.title, recipe_id, claims.sub);
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(recipe_id): PathParams<Uuid>,
    form: RecipeForm,
) -> Result<Json<Recipe>, ApiError> {
    let rid = recipe_id.to_string();
    let row = run_db(&state, move |db| db.get_recipe(&rid))
        .await?
        .ok_or(ApiError::NotFound("Recipe not found"))?;
    ensure_owner_or_admin(&claims, &row.record.created_by)?;

    let changes = RecipeChanges::from_fields(&form.fields)?;
    let mut record = row.record;
    let previous_image = record.image.clone();
    changes.apply(&mut record);

    let new_image = match form.image {
        Some(upload) => Some(store_image(&state, claims.sub, upload).await?),
        None => None,
    };
    if let Some(path) = &new_image {
        record.image = Some(path.clone());
    }

    let updated = run_db(&state, move |db| {
        if !db.update_recipe(&record)? {
            return Ok(None);
        }
        match db.get_recipe(&record.id)? {
            Some(row) => {
                let comments = db.comments_for_recipe(&record.id)?;
                Ok(Some(recipe_from_row(row, comments)))
            }
            None => Ok(None),
        }
    })
    .await;

    let recipe = match updated {
        Ok(Some(recipe)) => recipe,
        // deleted between the ownership check and the write
        Ok(None) => {
            if let Some(path) = &new_image {
                discard_image(&state, path).await;
            }
            return Err(ApiError::NotFound("Recipe not found"));
        }
        Err(e) => {
            if let Some(path) = &new_image {
                discard_image(&state, path).await;
            }
            return Err(e);
        }
    };

    if let (Some(_), Some(old)) = (&new_image, previous_image) {
        discard_image(&state, &old).await;
    }

    info!("Recipe {} updated by {}", recipe_id, claims.sub);
    Ok(Json(recipe))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(recipe_id): PathParams<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let rid = recipe_id.to_string();
    let row = run_db(&state, move |db| db.get_recipe(&rid))
        .await?
        .ok_or(ApiError::NotFound("Recipe not found"))?;
    ensure_owner_or_admin(&claims, &row.record.created_by)?;

    remove_recipe(&state, recipe_id).await?;
    info!("Recipe {} deleted by {}", recipe_id, claims.sub);
    Ok(Json(MessageResponse::new("Recipe deleted successfully")))
}

/// Delete a recipe, its comments and its image. Shared with moderation.
pub(crate) async fn remove_recipe(state: &AppState, recipe_id: Uuid) -> Result<(), ApiError> {
    let rid = recipe_id.to_string();
    let image = run_db(state, move |db| {
        let Some(row) = db.get_recipe(&rid)? else {
            return Ok(None);
        };
        let image = row.record.image;
        Ok(db.delete_recipe(&rid)?.then_some(image))
    })
    .await?
    .ok_or(ApiError::NotFound("Recipe not found"))?;

    if let Some(path) = image {
        discard_image(state, &path).await;
    }
    Ok(())
}

pub(crate) async fn load_recipe(state: &AppState, recipe_id: Uuid) -> Result<Option<Recipe>, ApiError> {
    let rid = recipe_id.to_string();
    run_db(state, move |db| {
        let Some(row) = db.get_recipe(&rid)? else {
            return Ok(None);
        };
        let comments = db.comments_for_recipe(&rid)?;
        Ok(Some(recipe_from_row(row, comments)))
    })
    .await
}

/// Attach comments to a batch of rows with one extra query.
pub(crate) fn hydrate(db: &dishcovery_db::Database, rows: Vec<RecipeRow>) -> anyhow::Result<Vec<Recipe>> {
    let ids: Vec<String> = rows.iter().map(|r| r.record.id.clone()).collect();
    let mut comments = db.comments_for_recipes(&ids)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let own = comments.remove(&row.record.id).unwrap_or_default();
            recipe_from_row(row, own)
        })
        .collect())
}

async fn store_image(state: &AppState, uploader: Uuid, upload: UploadedImage) -> Result<String, ApiError> {
    if upload.bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::PayloadTooLarge);
    }
    let path = state
        .images
        .save(uploader, upload.file_name.as_deref(), &upload.bytes)
        .await?;
    info!("Stored image {} ({} bytes)", path, upload.bytes.len());
    Ok(path)
}

async fn discard_image(state: &AppState, public_path: &str) {
    if let Err(e) = state.images.delete(public_path).await {
        warn!("Failed to delete image {}: {}", public_path, e);
    }
}
