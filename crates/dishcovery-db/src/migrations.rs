use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                admin       INTEGER NOT NULL DEFAULT 0,
                is_disabled INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            -- ingredients, steps, allergens and seo_tags hold JSON arrays.
            -- created_by has no foreign key: deleting an account leaves its
            -- recipes in place with an unresolvable creator.
            CREATE TABLE recipes (
                id               TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                description      TEXT,
                ingredients      TEXT NOT NULL DEFAULT '[]',
                steps            TEXT NOT NULL DEFAULT '[]',
                prep_time        INTEGER NOT NULL,
                cook_time        INTEGER NOT NULL,
                servings         INTEGER NOT NULL,
                is_vegan         INTEGER NOT NULL DEFAULT 0,
                allergens        TEXT NOT NULL DEFAULT '[]',
                seo_tags         TEXT NOT NULL DEFAULT '[]',
                comments_enabled INTEGER NOT NULL DEFAULT 1,
                image            TEXT,
                created_by       TEXT NOT NULL,
                created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_recipes_created_by ON recipes(created_by);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL,
                body        TEXT,
                rating      INTEGER CHECK (rating BETWEEN 1 AND 5),
                reported    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                CHECK (body IS NOT NULL OR rating IS NOT NULL)
            );

            CREATE INDEX idx_comments_recipe ON comments(recipe_id);

            -- recipe_id is a weak reference; stale rows are skipped on read.
            CREATE TABLE saved_recipes (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id   TEXT NOT NULL,
                saved_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (user_id, recipe_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
