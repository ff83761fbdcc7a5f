use std::collections::HashMap;

use anyhow::Result;
use rusqlite::types::Type;
use serde::de::DeserializeOwned;

use crate::models::{CommentRow, NewComment, RecipeRecord, RecipeRow, ReportedCommentRow};
use crate::search::RecipeFilter;
use crate::{Database, OptionalExt};

/// Recipe columns joined with the creator's username, in `map_recipe_row` order.
pub(crate) const RECIPE_SELECT: &str = "SELECT r.id, r.title, r.description, r.ingredients, r.steps,
        r.prep_time, r.cook_time, r.servings, r.is_vegan, r.allergens, r.seo_tags,
        r.comments_enabled, r.image, r.created_by, u.username, r.created_at
     FROM recipes r
     LEFT JOIN users u ON u.id = r.created_by";

const COMMENT_SELECT: &str = "SELECT c.id, c.recipe_id, c.author_id, u.username, c.body, c.rating,
        c.reported, c.created_at
     FROM comments c
     LEFT JOIN users u ON u.id = c.author_id";

impl Database {
    // -- Recipes --

    pub fn insert_recipe(&self, recipe: &RecipeRecord) -> Result<()> {
        let encoded = EncodedLists::new(recipe)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO recipes (id, title, description, ingredients, steps, prep_time, cook_time,
                    servings, is_vegan, allergens, seo_tags, comments_enabled, image, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    recipe.id,
                    recipe.title,
                    recipe.description,
                    encoded.ingredients,
                    encoded.steps,
                    recipe.prep_time,
                    recipe.cook_time,
                    recipe.servings,
                    recipe.is_vegan,
                    encoded.allergens,
                    encoded.seo_tags,
                    recipe.comments_enabled,
                    recipe.image,
                    recipe.created_by,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!("{RECIPE_SELECT} WHERE r.id = ?1");
            let row = conn.query_row(&sql, [id], map_recipe_row).optional()?;
            Ok(row)
        })
    }

    /// Overwrite every writable column except `created_by`.
    /// Returns false when the recipe no longer exists.
    pub fn update_recipe(&self, recipe: &RecipeRecord) -> Result<bool> {
        let encoded = EncodedLists::new(recipe)?;
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE recipes SET title = ?2, description = ?3, ingredients = ?4, steps = ?5,
                    prep_time = ?6, cook_time = ?7, servings = ?8, is_vegan = ?9, allergens = ?10,
                    seo_tags = ?11, comments_enabled = ?12, image = ?13
                 WHERE id = ?1",
                rusqlite::params![
                    recipe.id,
                    recipe.title,
                    recipe.description,
                    encoded.ingredients,
                    encoded.steps,
                    recipe.prep_time,
                    recipe.cook_time,
                    recipe.servings,
                    recipe.is_vegan,
                    encoded.allergens,
                    encoded.seo_tags,
                    recipe.comments_enabled,
                    recipe.image,
                ],
            )?;
            Ok(n > 0)
        })
    }

    /// Deletes the recipe and, through the foreign key, all of its comments.
    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn list_recipes(&self) -> Result<Vec<RecipeRow>> {
        self.search_recipes(&RecipeFilter::default())
    }

    pub fn list_recipes_by_creator(&self, user_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!("{RECIPE_SELECT} WHERE r.created_by = ?1 ORDER BY r.rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_recipe_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Run a search as a single query. An empty filter returns everything.
    pub fn search_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeRow>> {
        let (clause, params) = filter.to_sql();
        self.with_conn(|conn| {
            let sql = if clause.is_empty() {
                format!("{RECIPE_SELECT} ORDER BY r.rowid")
            } else {
                format!("{RECIPE_SELECT} WHERE {clause} ORDER BY r.rowid")
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_recipe_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// (id, title) for every recipe, used by autocomplete.
    pub fn recipe_titles(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, title FROM recipes ORDER BY rowid")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, comment: &NewComment) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, recipe_id, author_id, body, rating) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    comment.id,
                    comment.recipe_id,
                    comment.author_id,
                    comment.body,
                    comment.rating,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, recipe_id: &str, comment_id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.recipe_id = ?1 AND c.id = ?2");
            let row = conn
                .query_row(&sql, [recipe_id, comment_id], map_comment_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn comments_for_recipe(&self, recipe_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.recipe_id = ?1 ORDER BY c.rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([recipe_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch comments for a set of recipes, grouped by recipe id.
    pub fn comments_for_recipes(&self, recipe_ids: &[String]) -> Result<HashMap<String, Vec<CommentRow>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=recipe_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "{COMMENT_SELECT} WHERE c.recipe_id IN ({}) ORDER BY c.rowid",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(recipe_ids.iter()), map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut grouped: HashMap<String, Vec<CommentRow>> = HashMap::new();
            for row in rows {
                grouped.entry(row.recipe_id.clone()).or_default().push(row);
            }
            Ok(grouped)
        })
    }

    pub fn delete_comment(&self, recipe_id: &str, comment_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM comments WHERE recipe_id = ?1 AND id = ?2",
                [recipe_id, comment_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Flag a comment for moderation. Idempotent; returns false if the
    /// comment does not exist on that recipe.
    pub fn report_comment(&self, recipe_id: &str, comment_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE comments SET reported = 1 WHERE recipe_id = ?1 AND id = ?2",
                [recipe_id, comment_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn reported_comments(&self) -> Result<Vec<ReportedCommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.recipe_id, c.author_id, u.username, c.body, c.rating,
                        c.reported, c.created_at, r.title
                 FROM comments c
                 JOIN recipes r ON r.id = c.recipe_id
                 LEFT JOIN users u ON u.id = c.author_id
                 WHERE c.reported = 1
                 ORDER BY r.rowid, c.rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ReportedCommentRow {
                        comment: map_comment_row(row)?,
                        recipe_title: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// JSON text for the array columns, encoded once before taking the lock.
struct EncodedLists {
    ingredients: String,
    steps: String,
    allergens: String,
    seo_tags: String,
}

impl EncodedLists {
    fn new(recipe: &RecipeRecord) -> Result<Self> {
        Ok(Self {
            ingredients: serde_json::to_string(&recipe.ingredients)?,
            steps: serde_json::to_string(&recipe.steps)?,
            allergens: serde_json::to_string(&recipe.allergens)?,
            seo_tags: serde_json::to_string(&recipe.seo_tags)?,
        })
    }
}

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn map_recipe_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        record: RecipeRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            ingredients: json_column(row, 3)?,
            steps: json_column(row, 4)?,
            prep_time: row.get(5)?,
            cook_time: row.get(6)?,
            servings: row.get(7)?,
            is_vegan: row.get(8)?,
            allergens: json_column(row, 9)?,
            seo_tags: json_column(row, 10)?,
            comments_enabled: row.get(11)?,
            image: row.get(12)?,
            created_by: row.get(13)?,
        },
        creator_username: row.get(14)?,
        created_at: row.get(15)?,
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        body: row.get(4)?,
        rating: row.get(5)?,
        reported: row.get(6)?,
        created_at: row.get(7)?,
    })
}
