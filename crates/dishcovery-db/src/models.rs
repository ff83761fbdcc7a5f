//! Database row types. These map directly to SQLite rows.
//! Distinct from dishcovery-types API models to keep the DB layer independent.

use dishcovery_types::models::Ingredient;

/// Result of inserting a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewUserOutcome {
    Created,
    EmailTaken,
    UsernameTaken,
}

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub admin: bool,
    pub is_disabled: bool,
    pub created_at: String,
}

/// Writable columns of a recipe. `created_by` is only read on insert;
/// updates never touch it.
#[derive(Debug, Clone)]
pub struct RecipeRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub is_vegan: bool,
    pub allergens: Vec<String>,
    pub seo_tags: Vec<String>,
    pub comments_enabled: bool,
    pub image: Option<String>,
    pub created_by: String,
}

pub struct RecipeRow {
    pub record: RecipeRecord,
    /// `None` when the creator account no longer exists.
    pub creator_username: Option<String>,
    pub created_at: String,
}

pub struct NewComment {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub body: Option<String>,
    pub rating: Option<u8>,
}

pub struct CommentRow {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub author_username: Option<String>,
    pub body: Option<String>,
    pub rating: Option<u8>,
    pub reported: bool,
    pub created_at: String,
}

pub struct ReportedCommentRow {
    pub recipe_title: String,
    pub comment: CommentRow,
}
