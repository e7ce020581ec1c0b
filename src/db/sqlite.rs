use crate::db::models::{
    DbFeedItem, DbMicropost, DbRelationship, DbUser, NewUser, UserChanges,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::MicroblogError;
use crate::types::{Page, ValidationErrors};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

const USER_COLUMNS: &str = "u.id AS id, u.name AS name, u.email AS email, \
     u.password_digest AS password_digest, u.remember_token AS remember_token, \
     u.admin AS admin, u.created_at AS created_at, u.updated_at AS updated_at";

/// Open (creating if missing) the database at `database_url` and apply the schema.
pub async fn connect(database_url: &str) -> Result<Storage, MicroblogError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    let storage = Storage::new(pool);
    storage.init_schema().await?;
    debug!(database_url, "storage ready");
    Ok(storage)
}

/// Repository over the `users`, `microposts` and `relationships` tables.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), MicroblogError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ---- users ----

    /// Insert a user. A clash on the case-insensitive email index comes back as
    /// the `email` validation error.
    pub async fn insert_user(&self, user: &NewUser) -> Result<DbUser, MicroblogError> {
        let now = encode_ts(Utc::now());
        let res = sqlx::query(
            r#"
            INSERT INTO users (
                name, email, password_digest, remember_token, admin, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_digest)
        .bind(&user.remember_token)
        .bind(if user.admin { 1 } else { 0 })
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(email_taken_on_conflict)?;

        self.get_user(res.last_insert_rowid())
            .await?
            .ok_or(MicroblogError::NotFound("User"))
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<DbUser>, MicroblogError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    /// Case-insensitive lookup (the column is `COLLATE NOCASE`).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<DbUser>, MicroblogError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_user).transpose()
    }

    pub async fn find_user_by_remember_token(
        &self,
        digest: &str,
    ) -> Result<Option<DbUser>, MicroblogError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.remember_token = ?"
        ))
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_user).transpose()
    }

    /// Whether another account (other than `except_id`) already uses `email`.
    pub async fn email_taken(
        &self,
        email: &str,
        except_id: Option<i64>,
    ) -> Result<bool, MicroblogError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(except_id.unwrap_or(0))
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0 > 0)
    }

    pub async fn update_user(
        &self,
        id: i64,
        changes: &UserChanges,
    ) -> Result<DbUser, MicroblogError> {
        let res = sqlx::query(
            r#"UPDATE users SET
                name = ?,
                email = ?,
                password_digest = ?,
                updated_at = ?
              WHERE id = ?"#,
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.password_digest)
        .bind(encode_ts(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(email_taken_on_conflict)?;
        if res.rows_affected() == 0 {
            return Err(MicroblogError::NotFound("User"));
        }
        self.get_user(id).await?.ok_or(MicroblogError::NotFound("User"))
    }

    pub async fn set_remember_token(&self, id: i64, digest: &str) -> Result<(), MicroblogError> {
        sqlx::query("UPDATE users SET remember_token = ? WHERE id = ?")
            .bind(digest)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_admin(&self, id: i64, admin: bool) -> Result<(), MicroblogError> {
        let admin_i = if admin { 1 } else { 0 };
        sqlx::query("UPDATE users SET admin = ? WHERE id = ?")
            .bind(admin_i)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_users(&self, page: Page) -> Result<Vec<DbUser>, MicroblogError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u ORDER BY u.id LIMIT ? OFFSET ?"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    pub async fn count_users(&self) -> Result<i64, MicroblogError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    /// Delete a user; microposts and relationships in both directions go with it
    /// through the foreign-key cascades. Returns whether a row was removed.
    pub async fn delete_user(&self, id: i64) -> Result<bool, MicroblogError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // ---- microposts ----

    pub async fn insert_micropost(
        &self,
        user_id: i64,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<DbMicropost, MicroblogError> {
        let res = sqlx::query(
            "INSERT INTO microposts (user_id, content, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(content)
        .bind(encode_ts(created_at))
        .execute(&self.pool)
        .await?;
        self.get_micropost(res.last_insert_rowid())
            .await?
            .ok_or(MicroblogError::NotFound("Micropost"))
    }

    pub async fn get_micropost(&self, id: i64) -> Result<Option<DbMicropost>, MicroblogError> {
        let row = sqlx::query(
            "SELECT id, user_id, content, created_at FROM microposts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_micropost).transpose()
    }

    /// Delete a micropost only if `user_id` owns it.
    pub async fn delete_micropost(&self, id: i64, user_id: i64) -> Result<bool, MicroblogError> {
        let res = sqlx::query("DELETE FROM microposts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn microposts_by_user(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<DbMicropost>, MicroblogError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, content, created_at FROM microposts
               WHERE user_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_micropost).collect()
    }

    pub async fn count_microposts(&self, user_id: i64) -> Result<i64, MicroblogError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM microposts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    // ---- feed ----

    /// Posts by `user_id` or anyone `user_id` follows, newest first, in one query.
    pub async fn feed(&self, user_id: i64, page: Page) -> Result<Vec<DbFeedItem>, MicroblogError> {
        let rows = sqlx::query(
            r#"SELECT m.id AS id, m.user_id AS user_id, u.name AS user_name,
                      m.content AS content, m.created_at AS created_at
               FROM microposts m
               JOIN users u ON u.id = m.user_id
               WHERE m.user_id IN (SELECT followed_id FROM relationships WHERE follower_id = ?1)
                  OR m.user_id = ?1
               ORDER BY m.created_at DESC, m.id DESC
               LIMIT ?2 OFFSET ?3"#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_feed_item).collect()
    }

    pub async fn count_feed(&self, user_id: i64) -> Result<i64, MicroblogError> {
        let rec: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM microposts
               WHERE user_id IN (SELECT followed_id FROM relationships WHERE follower_id = ?1)
                  OR user_id = ?1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    // ---- relationships ----

    /// Insert a follow edge. A second insert for the same pair is `AlreadyFollowing`.
    pub async fn insert_relationship(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<DbRelationship, MicroblogError> {
        let created_at = Utc::now();
        let res = sqlx::query(
            "INSERT INTO relationships (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .bind(encode_ts(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MicroblogError::AlreadyFollowing {
                    follower_id,
                    followed_id,
                }
            } else {
                e.into()
            }
        })?;
        Ok(DbRelationship {
            id: res.last_insert_rowid(),
            follower_id,
            followed_id,
            created_at: decode_ts(&encode_ts(created_at))?,
        })
    }

    /// Returns whether an edge was removed.
    pub async fn delete_relationship(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<bool, MicroblogError> {
        let res = sqlx::query("DELETE FROM relationships WHERE follower_id = ? AND followed_id = ?")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn relationship_exists(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<bool, MicroblogError> {
        let rec: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM relationships WHERE follower_id = ? AND followed_id = ?",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec.is_some())
    }

    /// Users that `user_id` follows.
    pub async fn followed_users(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<DbUser>, MicroblogError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {USER_COLUMNS} FROM users u
               JOIN relationships r ON r.followed_id = u.id
               WHERE r.follower_id = ?
               ORDER BY u.name, u.id
               LIMIT ? OFFSET ?"#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    /// Users following `user_id`.
    pub async fn followers(&self, user_id: i64, page: Page) -> Result<Vec<DbUser>, MicroblogError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {USER_COLUMNS} FROM users u
               JOIN relationships r ON r.follower_id = u.id
               WHERE r.followed_id = ?
               ORDER BY u.name, u.id
               LIMIT ? OFFSET ?"#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    pub async fn count_followed(&self, user_id: i64) -> Result<i64, MicroblogError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM relationships WHERE follower_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }

    pub async fn count_followers(&self, user_id: i64) -> Result<i64, MicroblogError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM relationships WHERE followed_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }

    // ---- row mapping ----

    fn row_to_user(row: SqliteRow) -> Result<DbUser, MicroblogError> {
        let id: i64 = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let email: String = row.try_get("email")?;
        let password_digest: String = row.try_get("password_digest")?;
        let remember_token: Option<String> = row.try_get("remember_token")?;
        let admin_i: i64 = row.try_get("admin")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(DbUser {
            id,
            name,
            email,
            password_digest,
            remember_token,
            admin: admin_i != 0,
            created_at: decode_ts(&created_at)?,
            updated_at: decode_ts(&updated_at)?,
        })
    }

    fn row_to_micropost(row: SqliteRow) -> Result<DbMicropost, MicroblogError> {
        let created_at: String = row.try_get("created_at")?;
        Ok(DbMicropost {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            created_at: decode_ts(&created_at)?,
        })
    }

    fn row_to_feed_item(row: SqliteRow) -> Result<DbFeedItem, MicroblogError> {
        let created_at: String = row.try_get("created_at")?;
        Ok(DbFeedItem {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            content: row.try_get("content")?,
            created_at: decode_ts(&created_at)?,
        })
    }
}

/// Fixed-width RFC3339 with microseconds, so lexicographic order matches time order.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(s: &str) -> Result<DateTime<Utc>, MicroblogError> {
    let ts = DateTime::parse_from_rfc3339(s)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);
    Ok(ts)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn email_taken_on_conflict(e: sqlx::Error) -> MicroblogError {
    if is_unique_violation(&e) {
        ValidationErrors::single("email", "has already been taken").into()
    } else {
        e.into()
    }
}
