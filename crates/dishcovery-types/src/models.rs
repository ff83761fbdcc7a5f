use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
}

/// Public face of a user when referenced from a recipe or comment.
/// Never carries the email or password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

/// Admin view of an account. The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub admin: bool,
    pub is_disabled: bool,
    pub created_at: DateTime<Utc>,
    pub saved_recipes: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author: Option<UserSummary>,
    pub body: Option<String>,
    pub rating: Option<u8>,
    pub reported: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
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
    /// `None` once the creating account has been deleted.
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<Comment>,
    /// Mean of rated comments, one decimal. `None` when nobody has rated.
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}
