//! SQL DDL for initializing the microblog storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `users.email` UNIQUE with NOCASE collation, so `A@x.com` and `a@x.com` collide
/// - `microposts` and `relationships` referencing `users(id)` with ON DELETE CASCADE
/// - at most one relationship per ordered (follower, followed) pair
/// - timestamps as fixed-width RFC3339 UTC text, so text order is time order
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL COLLATE NOCASE UNIQUE,
    password_digest TEXT NOT NULL,
    remember_token TEXT NULL,
    admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL  -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_users_remember_token ON users(remember_token);

CREATE TABLE IF NOT EXISTS microposts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_microposts_user_id_created_at ON microposts(user_id, created_at);

CREATE TABLE IF NOT EXISTS relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    follower_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    followed_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL, -- RFC3339
    UNIQUE (follower_id, followed_id)
);

CREATE INDEX IF NOT EXISTS idx_relationships_follower_id ON relationships(follower_id);
CREATE INDEX IF NOT EXISTS idx_relationships_followed_id ON relationships(followed_id);
"#;
