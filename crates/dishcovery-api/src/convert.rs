//! Row → API model conversion, including reference resolution.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use dishcovery_db::models::{CommentRow, RecipeRow, UserRow};
use dishcovery_types::models::{Comment, Recipe, User, UserSummary};

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

/// Resolve a user reference. A missing username means the account is gone.
pub(crate) fn user_summary(id: &str, username: Option<String>) -> Option<UserSummary> {
    username.map(|username| UserSummary {
        id: parse_id(id, "user"),
        username,
    })
}

/// Mean of the given ratings rounded to one decimal, `None` when empty.
pub fn average_rating<I>(ratings: I) -> Option<f64>
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), r| (sum + u32::from(r), count + 1));
    if count == 0 {
        return None;
    }
    let mean = f64::from(sum) / f64::from(count);
    Some((mean * 10.0).round() / 10.0)
}

pub(crate) fn comment_from_row(row: CommentRow) -> Comment {
    Comment {
        id: parse_id(&row.id, "comment"),
        author: user_summary(&row.author_id, row.author_username),
        body: row.body,
        rating: row.rating,
        reported: row.reported,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn recipe_from_row(row: RecipeRow, comments: Vec<CommentRow>) -> Recipe {
    let rated: Vec<u8> = comments.iter().filter_map(|c| c.rating).collect();
    let record = row.record;

    Recipe {
        id: parse_id(&record.id, "recipe"),
        created_by: user_summary(&record.created_by, row.creator_username),
        created_at: parse_timestamp(&row.created_at),
        average_rating: average_rating(rated.iter().copied()),
        rating_count: rated.len(),
        comments: comments.into_iter().map(comment_from_row).collect(),
        title: record.title,
        description: record.description,
        ingredients: record.ingredients,
        steps: record.steps,
        prep_time: record.prep_time,
        cook_time: record.cook_time,
        servings: record.servings,
        is_vegan: record.is_vegan,
        allergens: record.allergens,
        seo_tags: record.seo_tags,
        comments_enabled: record.comments_enabled,
        image: record.image,
    }
}

pub(crate) fn user_from_row(row: UserRow, saved_recipes: Vec<Uuid>) -> User {
    User {
        id: parse_id(&row.id, "user"),
        created_at: parse_timestamp(&row.created_at),
        email: row.email,
        username: row.username,
        admin: row.admin,
        is_disabled: row.is_disabled,
        saved_recipes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_ignores_nothing_but_rounds_to_one_decimal() {
        assert_eq!(average_rating([4]), Some(4.0));
        assert_eq!(average_rating([5, 4, 4]), Some(4.3));
        assert_eq!(average_rating([1, 2]), Some(1.5));
        assert_eq!(average_rating(std::iter::empty()), None);
    }

    #[test]
    fn timestamps_accept_rfc3339_and_sqlite_formats() {
        let rfc = parse_timestamp("2024-05-01T12:30:00.250Z");
        assert_eq!(rfc.timestamp(), 1_714_566_600);
        let sqlite = parse_timestamp("2024-05-01 12:30:00");
        assert_eq!(sqlite.timestamp(), 1_714_566_600);
    }

    #[test]
    fn deleted_user_resolves_to_none() {
        assert!(user_summary("abc", None).is_none());
        let summary = user_summary(&Uuid::nil().to_string(), Some("ann".into())).unwrap();
        assert_eq!(summary.username, "ann");
    }
}
