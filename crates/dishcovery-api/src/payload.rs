//! Recipe create/update payloads.
//!
//! Browsers send recipes either as JSON or as multipart forms. Multipart
//! forms can only carry strings, so nested lists arrive JSON-encoded (or
//! comma-separated) inside a text field. Both shapes are folded into one
//! field map before any validation happens.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Map, Value};
use uuid::Uuid;

use dishcovery_db::models::RecipeRecord;
use dishcovery_types::models::Ingredient;

use crate::error::ApiError;
use crate::tags::{derive_tags, merge_tags};

/// Multipart field carrying the optional image file.
pub const IMAGE_FIELD: &str = "image";

pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Raw recipe fields plus an optional uploaded image.
pub struct RecipeForm {
    pub fields: Map<String, Value>,
    pub image: Option<UploadedImage>,
}

impl<S> FromRequest<S> for RecipeForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(value) = Json::<Value>::from_request(req, state).await?;
            return match value {
                Value::Object(fields) => Ok(Self { fields, image: None }),
                _ => Err(ApiError::validation("Recipe payload must be an object")),
            };
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;

        let mut fields = Map::new();
        let mut image = None;
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == IMAGE_FIELD {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    image = Some(UploadedImage { file_name, bytes });
                }
            } else {
                let text = field.text().await.map_err(multipart_error)?;
                fields.insert(name, Value::String(text));
            }
        }

        Ok(Self { fields, image })
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::validation(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

/// A fully validated new recipe.
#[derive(Debug)]
pub struct RecipeDraft {
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
}

impl RecipeDraft {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ApiError> {
        let title = field(fields, "title")
            .and_then(text)
            .ok_or_else(|| ApiError::validation("title is required"))?;
        let description = field(fields, "description").and_then(text);
        let ingredients = match field(fields, "ingredients") {
            Some(v) => parse_ingredients(v)?,
            None => Vec::new(),
        };
        let prep_time = required_count(fields, "prepTime")?;
        let cook_time = required_count(fields, "cookTime")?;
        let servings = required_count(fields, "servings")?;

        let user_tags = optional_list(fields, &["seoTags", "tags"], ',')?.unwrap_or_default();
        let derived = derive_tags(&title, description.as_deref(), ingredients.iter().map(|i| i.name.as_str()));

        Ok(Self {
            seo_tags: merge_tags(&user_tags, &derived),
            steps: parse_steps(fields)?.unwrap_or_default(),
            is_vegan: optional_flag(fields, "isVegan")?.unwrap_or(false),
            allergens: normalize_allergens(optional_list(fields, &["allergens"], ',')?.unwrap_or_default()),
            comments_enabled: optional_flag(fields, "commentsEnabled")?.unwrap_or(true),
            title,
            description,
            ingredients,
            prep_time,
            cook_time,
            servings,
        })
    }

    /// `created_by` comes from the caller's token, never from the payload.
    pub fn into_record(self, id: Uuid, creator: Uuid, image: Option<String>) -> RecipeRecord {
        RecipeRecord {
            id: id.to_string(),
            title: self.title,
            description: self.description,
            ingredients: self.ingredients,
            steps: self.steps,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            is_vegan: self.is_vegan,
            allergens: self.allergens,
            seo_tags: self.seo_tags,
            comments_enabled: self.comments_enabled,
            image,
            created_by: creator.to_string(),
        }
    }
}

/// A partial update: `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub steps: Option<Vec<String>>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub is_vegan: Option<bool>,
    pub allergens: Option<Vec<String>>,
    pub seo_tags: Option<Vec<String>>,
    pub comments_enabled: Option<bool>,
}

impl RecipeChanges {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ApiError> {
        let title = match field(fields, "title") {
            Some(v) => Some(text(v).ok_or_else(|| ApiError::validation("title cannot be empty"))?),
            None => None,
        };
        let description = fields
            .get("description")
            .map(|v| if v.is_null() { None } else { text(v) });
        let ingredients = field(fields, "ingredients").map(parse_ingredients).transpose()?;
        let user_tags = optional_list(fields, &["seoTags", "tags"], ',')?;

        // Tags are only re-derived when all of the source text is present.
        let seo_tags = match (&title, &description, &ingredients) {
            (Some(title), Some(description), Some(ingredients)) => {
                let derived = derive_tags(
                    title,
                    description.as_deref(),
                    ingredients.iter().map(|i| i.name.as_str()),
                );
                Some(merge_tags(&user_tags.unwrap_or_default(), &derived))
            }
            _ => user_tags.map(|tags| merge_tags(&tags, &[])),
        };

        Ok(Self {
            title,
            description,
            ingredients,
            steps: parse_steps(fields)?,
            prep_time: optional_count(fields, "prepTime")?,
            cook_time: optional_count(fields, "cookTime")?,
            servings: optional_count(fields, "servings")?,
            is_vegan: optional_flag(fields, "isVegan")?,
            allergens: optional_list(fields, &["allergens"], ',')?.map(normalize_allergens),
            seo_tags,
            comments_enabled: optional_flag(fields, "commentsEnabled")?,
        })
    }

    pub fn apply(self, record: &mut RecipeRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(ingredients) = self.ingredients {
            record.ingredients = ingredients;
        }
        if let Some(steps) = self.steps {
            record.steps = steps;
        }
        if let Some(prep_time) = self.prep_time {
            record.prep_time = prep_time;
        }
        if let Some(cook_time) = self.cook_time {
            record.cook_time = cook_time;
        }
        if let Some(servings) = self.servings {
            record.servings = servings;
        }
        if let Some(is_vegan) = self.is_vegan {
            record.is_vegan = is_vegan;
        }
        if let Some(allergens) = self.allergens {
            record.allergens = allergens;
        }
        if let Some(seo_tags) = self.seo_tags {
            record.seo_tags = seo_tags;
        }
        if let Some(comments_enabled) = self.comments_enabled {
            record.comments_enabled = comments_enabled;
        }
    }
}

/// A present, non-null field.
fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

/// Trimmed text; blank becomes `None`. Numbers are accepted as text.
fn text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

/// A list field may arrive as a real array or a string holding a JSON array.
fn decode_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

pub fn parse_ingredients(value: &Value) -> Result<Vec<Ingredient>, ApiError> {
    if value.as_str().is_some_and(|s| s.trim().is_empty()) {
        return Ok(Vec::new());
    }

    let items = decode_list(value)
        .ok_or_else(|| ApiError::validation("ingredients must be a list of {name, quantity}"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let name = item.get("name").and_then(text);
            let quantity = item.get("quantity").and_then(text);
            match (name, quantity) {
                (Some(name), Some(quantity)) => Ok(Ingredient { name, quantity }),
                _ => Err(ApiError::validation(format!(
                    "ingredient {} needs both a name and a quantity",
                    i + 1
                ))),
            }
        })
        .collect()
}

/// String list from an array, a JSON-encoded array, or a `separator`-split string.
/// Blank entries are dropped.
pub fn parse_string_list(value: &Value, separator: char) -> Result<Vec<String>, ApiError> {
    let items = match decode_list(value) {
        Some(items) => items.iter().filter_map(text).collect(),
        None => match value {
            Value::String(s) => s
                .split(separator)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => return Err(ApiError::validation("expected a list of strings")),
        },
    };
    Ok(items)
}

/// Non-negative whole number from a JSON number or numeric string.
pub fn parse_count(name: &str, value: &Value) -> Result<u32, ApiError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::validation(format!("{name} must be a whole number")))
}

pub fn parse_flag(name: &str, value: &Value) -> Result<bool, ApiError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" | "" => Ok(false),
            _ => Err(ApiError::validation(format!("{name} must be true or false"))),
        },
        _ => Err(ApiError::validation(format!("{name} must be true or false"))),
    }
}

fn required_count(fields: &Map<String, Value>, name: &str) -> Result<u32, ApiError> {
    let value = field(fields, name)
        .filter(|v| text(v).is_some())
        .ok_or_else(|| ApiError::validation(format!("{name} is required")))?;
    parse_count(name, value)
}

fn optional_count(fields: &Map<String, Value>, name: &str) -> Result<Option<u32>, ApiError> {
    field(fields, name).map(|v| parse_count(name, v)).transpose()
}

fn optional_flag(fields: &Map<String, Value>, name: &str) -> Result<Option<bool>, ApiError> {
    field(fields, name).map(|v| parse_flag(name, v)).transpose()
}

/// First present field among `names` (aliases), parsed as a string list.
fn optional_list(
    fields: &Map<String, Value>,
    names: &[&str],
    separator: char,
) -> Result<Option<Vec<String>>, ApiError> {
    names
        .iter()
        .find_map(|name| field(fields, name))
        .map(|v| parse_string_list(v, separator))
        .transpose()
}

/// `steps`, or the older single-string `instructions` split by line.
fn parse_steps(fields: &Map<String, Value>) -> Result<Option<Vec<String>>, ApiError> {
    optional_list(fields, &["steps", "instructions"], '\n')
}

fn normalize_allergens(raw: Vec<String>) -> Vec<String> {
    let mut allergens: Vec<String> = Vec::new();
    for allergen in raw {
        let allergen = allergen.trim().to_lowercase();
        if !allergen.is_empty() && !allergens.contains(&allergen) {
            allergens.push(allergen);
        }
    }
    allergens
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn structured_json_payload_parses() {
        let draft = RecipeDraft::from_fields(&fields(json!({
            "title": "Tofu Stir Fry",
            "prepTime": 10,
            "cookTime": 15,
            "servings": 2,
            "ingredients": [{"name": "tofu", "quantity": "200g"}],
            "steps": ["Press tofu", "Fry"],
            "isVegan": true,
            "allergens": ["Soy", "soy "],
            "seoTags": ["Vegan", "vegan"],
            "createdBy": "someone-else"
        })))
        .unwrap();

        assert_eq!(draft.title, "Tofu Stir Fry");
        assert_eq!(draft.prep_time, 10);
        assert!(draft.is_vegan);
        assert!(draft.comments_enabled);
        assert_eq!(draft.allergens, vec!["soy"]);
        assert_eq!(draft.steps, vec!["Press tofu", "Fry"]);
        assert_eq!(draft.seo_tags[0], "Vegan");
        assert!(draft.seo_tags.contains(&"tofu".to_string()));
        assert!(draft.seo_tags.contains(&"recipe".to_string()));
        assert_eq!(
            draft.seo_tags.iter().filter(|t| t.eq_ignore_ascii_case("vegan")).count(),
            1
        );
    }

    #[test]
    fn stringified_form_payload_parses() {
        let draft = RecipeDraft::from_fields(&fields(json!({
            "title": "Pancakes",
            "prepTime": "5",
            "cookTime": "10",
            "servings": "4",
            "ingredients": "[{\"name\":\"flour\",\"quantity\":\"1 cup\"}]",
            "steps": "[\"Mix\",\"Cook\"]",
            "allergens": "gluten, egg",
            "isVegan": "false",
            "commentsEnabled": "false"
        })))
        .unwrap();

        assert_eq!(draft.servings, 4);
        assert_eq!(draft.ingredients[0].name, "flour");
        assert_eq!(draft.steps, vec!["Mix", "Cook"]);
        assert_eq!(draft.allergens, vec!["gluten", "egg"]);
        assert!(!draft.is_vegan);
        assert!(!draft.comments_enabled);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let base = json!({"title": "X", "prepTime": 1, "cookTime": 1, "servings": 1});
        assert!(RecipeDraft::from_fields(&fields(base.clone())).is_ok());

        for missing in ["title", "prepTime", "cookTime", "servings"] {
            let mut payload = fields(base.clone());
            payload.remove(missing);
            let err = RecipeDraft::from_fields(&payload).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{missing}");
        }
    }

    #[test]
    fn ingredient_without_quantity_is_rejected() {
        let err = RecipeDraft::from_fields(&fields(json!({
            "title": "X", "prepTime": 1, "cookTime": 1, "servings": 1,
            "ingredients": [{"name": "salt"}]
        })))
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn negative_or_fractional_counts_are_rejected() {
        assert!(parse_count("servings", &json!(-1)).is_err());
        assert!(parse_count("servings", &json!(1.5)).is_err());
        assert!(parse_count("servings", &json!("abc")).is_err());
        assert_eq!(parse_count("servings", &json!(" 3 ")).unwrap(), 3);
    }

    #[test]
    fn instructions_text_splits_into_steps() {
        let steps = parse_steps(&fields(json!({"instructions": "Boil water\n\nAdd pasta\n"})))
            .unwrap()
            .unwrap();
        assert_eq!(steps, vec!["Boil water", "Add pasta"]);
    }

    #[test]
    fn partial_update_touches_only_present_fields() {
        let mut record = RecipeDraft::from_fields(&fields(json!({
            "title": "Old", "description": "keep me", "prepTime": 1, "cookTime": 2, "servings": 3,
            "seoTags": ["Mine"]
        })))
        .unwrap()
        .into_record(Uuid::new_v4(), Uuid::new_v4(), Some("/uploads/a.png".into()));
        let tags_before = record.seo_tags.clone();

        let changes = RecipeChanges::from_fields(&fields(json!({"title": "New", "servings": "6"}))).unwrap();
        assert!(changes.seo_tags.is_none());
        changes.apply(&mut record);

        assert_eq!(record.title, "New");
        assert_eq!(record.servings, 6);
        assert_eq!(record.prep_time, 1);
        assert_eq!(record.description.as_deref(), Some("keep me"));
        assert_eq!(record.seo_tags, tags_before);
        assert_eq!(record.image.as_deref(), Some("/uploads/a.png"));
    }

    #[test]
    fn full_text_update_rederives_tags() {
        let changes = RecipeChanges::from_fields(&fields(json!({
            "title": "Lentil Soup",
            "description": "Hearty",
            "ingredients": [{"name": "lentils", "quantity": "1 cup"}],
            "seoTags": "Winter"
        })))
        .unwrap();
        let tags = changes.seo_tags.unwrap();
        assert_eq!(tags[0], "Winter");
        assert!(tags.contains(&"lentil".to_string()));
        assert!(tags.contains(&"lentils".to_string()));
        assert!(tags.contains(&"hearty".to_string()));
    }

    #[test]
    fn blank_title_in_update_is_rejected() {
        let err = RecipeChanges::from_fields(&fields(json!({"title": "  "}))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
