use crate::models::{NewUserOutcome, RecipeRow, UserRow};
use crate::recipes::{RECIPE_SELECT, map_recipe_row};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Connection;

const USER_COLUMNS: &str = "id, email, username, password, admin, is_disabled, created_at";

impl Database {
    // -- Users --

    /// Check both unique columns and insert under one lock, so two
    /// registrations racing for the same name cannot both pass the check.
    pub fn create_user(&self, id: &str, email: &str, username: &str, password_hash: &str) -> Result<NewUserOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if exists(&tx, "email", email)? {
                return Ok(NewUserOutcome::EmailTaken);
            }
            if exists(&tx, "username", username)? {
                return Ok(NewUserOutcome::UsernameTaken);
            }

            tx.execute(
                "INSERT INTO users (id, email, username, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, username, password_hash),
            )?;
            tx.commit()?;
            Ok(NewUserOutcome::Created)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"))?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flip the disabled flag. Returns the new state, or `None` if the user
    /// does not exist.
    pub fn toggle_user_disabled(&self, id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let current: Option<bool> = tx
                .query_row("SELECT is_disabled FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;

            let Some(current) = current else {
                return Ok(None);
            };

            tx.execute("UPDATE users SET is_disabled = ?1 WHERE id = ?2", (!current, id))?;
            tx.commit()?;
            Ok(Some(!current))
        })
    }

    /// Returns false when no such user existed.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Grant the admin flag to each named account that exists.
    /// Returns how many accounts were changed.
    pub fn promote_admins(&self, usernames: &[String]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let mut changed = 0;
            for username in usernames {
                changed += conn.execute(
                    "UPDATE users SET admin = 1 WHERE username = ?1 AND admin = 0",
                    [username],
                )?;
            }
            Ok(changed)
        })
    }

    // -- Saved recipes --

    /// Toggle a saved recipe: removes if present, inserts if not.
    /// Returns `Some(saved)` with the resulting membership, or `None` when
    /// the recipe is not saved and does not exist (nothing to save).
    pub fn toggle_saved(&self, user_id: &str, recipe_id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM saved_recipes WHERE user_id = ?1 AND recipe_id = ?2",
                [user_id, recipe_id],
            )?;
            if removed > 0 {
                tx.commit()?;
                return Ok(Some(false));
            }

            let exists: Option<i64> = tx
                .query_row("SELECT 1 FROM recipes WHERE id = ?1", [recipe_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO saved_recipes (user_id, recipe_id) VALUES (?1, ?2)",
                [user_id, recipe_id],
            )?;
            tx.commit()?;
            Ok(Some(true))
        })
    }

    pub fn is_saved(&self, user_id: &str, recipe_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM saved_recipes WHERE user_id = ?1 AND recipe_id = ?2",
                    [user_id, recipe_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Every (user_id, recipe_id) pair, including stale ones.
    pub fn saved_pairs(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id, recipe_id FROM saved_recipes ORDER BY saved_at, rowid")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Saved recipes resolved to full rows. References to deleted recipes
    /// drop out of the inner join.
    pub fn list_saved_recipes(&self, user_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{RECIPE_SELECT}
                 JOIN saved_recipes s ON s.recipe_id = r.id
                 WHERE s.user_id = ?1
                 ORDER BY s.saved_at, s.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_recipe_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn exists(conn: &Connection, column: &str, value: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM users WHERE {column} = ?1"), [value], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    let row = stmt.query_row([value], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        admin: row.get(4)?,
        is_disabled: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeRecord;

    fn db_with_user(username: &str) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(&id, &format!("{username}@example.com"), username, "hash")
            .unwrap();
        (db, id)
    }

    fn insert_recipe(db: &Database, creator: &str, title: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_recipe(&RecipeRecord {
            id: id.clone(),
            title: title.into(),
            description: None,
            ingredients: vec![],
            steps: vec![],
            prep_time: 1,
            cook_time: 1,
            servings: 1,
            is_vegan: false,
            allergens: vec![],
            seo_tags: vec![],
            comments_enabled: true,
            image: None,
            created_by: creator.into(),
        })
        .unwrap();
        id
    }

    #[test]
    fn duplicate_email_or_username_is_reported_not_inserted() {
        let (db, _) = db_with_user("alice");
        assert_eq!(
            db.create_user("id-2", "different@example.com", "alice", "hash").unwrap(),
            NewUserOutcome::UsernameTaken
        );
        assert_eq!(
            db.create_user("id-3", "alice@example.com", "alice2", "hash").unwrap(),
            NewUserOutcome::EmailTaken
        );
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn racing_registrations_create_one_account() {
        let db = std::sync::Arc::new(Database::open_in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    db.create_user(&format!("id-{i}"), &format!("racer{i}@example.com"), "racer", "hash")
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<NewUserOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = outcomes.iter().filter(|o| **o == NewUserOutcome::Created).count();
        assert_eq!(created, 1);
        assert!(
            outcomes
                .iter()
                .all(|o| matches!(o, NewUserOutcome::Created | NewUserOutcome::UsernameTaken))
        );
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn toggle_disabled_flips_and_reports_missing() {
        let (db, id) = db_with_user("bob");
        assert_eq!(db.toggle_user_disabled(&id).unwrap(), Some(true));
        assert!(db.get_user_by_id(&id).unwrap().unwrap().is_disabled);
        assert_eq!(db.toggle_user_disabled(&id).unwrap(), Some(false));
        assert_eq!(db.toggle_user_disabled("nope").unwrap(), None);
    }

    #[test]
    fn double_toggle_restores_membership() {
        let (db, user) = db_with_user("carol");
        let recipe = insert_recipe(&db, &user, "Soup");

        assert!(!db.is_saved(&user, &recipe).unwrap());
        assert_eq!(db.toggle_saved(&user, &recipe).unwrap(), Some(true));
        assert!(db.is_saved(&user, &recipe).unwrap());
        assert_eq!(db.toggle_saved(&user, &recipe).unwrap(), Some(false));
        assert!(!db.is_saved(&user, &recipe).unwrap());
    }

    #[test]
    fn saving_unknown_recipe_is_refused() {
        let (db, user) = db_with_user("dave");
        assert_eq!(db.toggle_saved(&user, "missing").unwrap(), None);
        assert!(!db.is_saved(&user, "missing").unwrap());
    }

    #[test]
    fn stale_saved_references_are_skipped() {
        let (db, user) = db_with_user("erin");
        let kept = insert_recipe(&db, &user, "Kept");
        let gone = insert_recipe(&db, &user, "Gone");
        db.toggle_saved(&user, &kept).unwrap();
        db.toggle_saved(&user, &gone).unwrap();

        assert!(db.delete_recipe(&gone).unwrap());

        let saved = db.list_saved_recipes(&user).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].record.title, "Kept");
        // the stale id is still recorded and can still be unsaved
        assert_eq!(db.toggle_saved(&user, &gone).unwrap(), Some(false));
    }

    #[test]
    fn promote_admins_only_touches_named_accounts() {
        let (db, id) = db_with_user("frank");
        let changed = db
            .promote_admins(&["frank".to_string(), "ghost".to_string()])
            .unwrap();
        assert_eq!(changed, 1);
        assert!(db.get_user_by_id(&id).unwrap().unwrap().admin);
    }
}
