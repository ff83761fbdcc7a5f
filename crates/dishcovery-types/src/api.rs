use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserSummary;

// -- JWT Claims --

/// Claims carried by every session token. Decoded by the auth middleware
/// and handed to handlers through request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub msg: String,
    pub token: String,
    pub user: SessionUser,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

// -- Recipes --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(alias = "searchedItem")]
    pub keyword: Option<String>,
    /// Only the literal string `"true"` turns the filter on.
    pub is_vegan: Option<String>,
    /// Comma-separated allergen names.
    pub exclude_allergens: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeTitle {
    pub id: Uuid,
    pub title: String,
}

// -- Comments --

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(default, alias = "comment", alias = "text")]
    pub body: Option<String>,
    /// Kept loose so `"4"`, `4` and `4.5` all reach the rating rules.
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
}

// -- Saved recipes --

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleSaveResponse {
    pub saved: bool,
    pub msg: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsSavedResponse {
    pub is_saved: bool,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleDisableResponse {
    pub msg: String,
    pub is_disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedComment {
    pub recipe_id: Uuid,
    pub recipe_title: String,
    pub comment_id: Uuid,
    pub body: Option<String>,
    pub rating: Option<u8>,
    pub author: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}
