use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use base64::Engine;
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::db::Storage;
use crate::db::models::{DbUser, NewUser, UserChanges};
use crate::error::MicroblogError;
use crate::types::{Page, Paged, ValidationErrors, user::AccountForm};

pub const NAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 6;

// ASCII classes only: `\w`, `\d` and `(?i)` would widen to Unicode here.
static VALID_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_+\-.]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]+$")
        .unwrap_or_else(|e| panic!("email pattern must compile: {e}"))
});

/// Check name, email and password shape. Uniqueness needs the database and is
/// checked by [`Accounts`].
pub fn validate_account(form: &AccountForm) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.add("name", "can't be blank");
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.add(
            "name",
            format!("is too long (maximum is {NAME_MAX_CHARS} characters)"),
        );
    }

    let email = form.email.trim();
    if email.is_empty() {
        errors.add("email", "can't be blank");
    }
    if !VALID_EMAIL.is_match(email) {
        errors.add("email", "is invalid");
    }

    if form.password.is_empty() {
        errors.add("password", "can't be blank");
    }
    if form.password.chars().count() < PASSWORD_MIN_CHARS {
        errors.add(
            "password",
            format!("is too short (minimum is {PASSWORD_MIN_CHARS} characters)"),
        );
    }

    if form.password_confirmation.is_empty() {
        errors.add("password_confirmation", "can't be blank");
    } else if form.password_confirmation != form.password {
        errors.add("password_confirmation", "doesn't match Password");
    }

    errors
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generates a new password hash using argon2.
pub fn hash_password(password: &str) -> Result<String, MicroblogError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Uses argon2 to verify the password against a stored PHC string.
pub fn verify_password(password_digest: &str, password: &str) -> bool {
    let hash = match PasswordHash::new(password_digest) {
        Ok(hash) => hash,
        Err(err) => {
            warn!(error = %err, "failed to parse password hash");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

/// A fresh opaque session token: 16 random bytes, URL-safe base64 without padding.
pub fn new_remember_token() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Deterministic digest stored in place of the raw remember token.
pub fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// A signed-in user plus the raw remember token destined for their cookie.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: DbUser,
    pub remember_token: String,
}

/// Signup, profile edits, sign in/out and admin actions over user accounts.
#[derive(Clone)]
pub struct Accounts {
    storage: Storage,
}

impl Accounts {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Validate and create an account. The new user starts signed in.
    pub async fn signup(&self, form: &AccountForm) -> Result<Session, MicroblogError> {
        let email = normalize_email(&form.email);
        let mut errors = validate_account(form);
        if errors.on("email").next().is_none() && self.storage.email_taken(&email, None).await? {
            errors.add("email", "has already been taken");
        }
        errors.into_result()?;

        let remember_token = new_remember_token();
        let user = self
            .storage
            .insert_user(&NewUser {
                name: form.name.trim().to_string(),
                email,
                password_digest: hash_password(&form.password)?,
                remember_token: digest(&remember_token),
                admin: false,
            })
            .await?;
        info!(user_id = user.id, "account created");
        Ok(Session {
            user,
            remember_token,
        })
    }

    /// Replace name, email and password of `id`. The password is required on
    /// every edit, as on signup.
    pub async fn update_profile(
        &self,
        id: i64,
        form: &AccountForm,
    ) -> Result<DbUser, MicroblogError> {
        let email = normalize_email(&form.email);
        let mut errors = validate_account(form);
        if errors.on("email").next().is_none()
            && self.storage.email_taken(&email, Some(id)).await?
        {
            errors.add("email", "has already been taken");
        }
        errors.into_result()?;

        let user = self
            .storage
            .update_user(
                id,
                &UserChanges {
                    name: form.name.trim().to_string(),
                    email,
                    password_digest: hash_password(&form.password)?,
                },
            )
            .await?;
        info!(user_id = id, "profile updated");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, MicroblogError> {
        let Some(user) = self
            .storage
            .find_user_by_email(&normalize_email(email))
            .await?
        else {
            return Err(MicroblogError::InvalidCredentials);
        };
        if !verify_password(&user.password_digest, password) {
            info!(user_id = user.id, "sign-in rejected");
            return Err(MicroblogError::InvalidCredentials);
        }

        let remember_token = new_remember_token();
        self.storage
            .set_remember_token(user.id, &digest(&remember_token))
            .await?;
        info!(user_id = user.id, "signed in");
        Ok(Session {
            user,
            remember_token,
        })
    }

    /// Rotate the stored digest so the cookie held by the client stops matching.
    pub async fn sign_out(&self, user_id: i64) -> Result<(), MicroblogError> {
        self.storage
            .set_remember_token(user_id, &digest(&new_remember_token()))
            .await?;
        info!(user_id, "signed out");
        Ok(())
    }

    pub async fn current_user(&self, remember_token: &str) -> Result<Option<DbUser>, MicroblogError> {
        self.storage
            .find_user_by_remember_token(&digest(remember_token))
            .await
    }

    pub async fn find(&self, id: i64) -> Result<DbUser, MicroblogError> {
        self.storage
            .get_user(id)
            .await?
            .ok_or(MicroblogError::NotFound("User"))
    }

    pub async fn list(&self, page: Page) -> Result<Paged<DbUser>, MicroblogError> {
        let users = self.storage.list_users(page).await?;
        let total = self.storage.count_users().await?;
        Ok(Paged::new(users, page, total))
    }

    /// Admin-only deletion of another account, with everything it owns.
    pub async fn delete(&self, actor: &DbUser, id: i64) -> Result<(), MicroblogError> {
        if !actor.admin || actor.id == id {
            warn!(actor_id = actor.id, target_id = id, "user deletion refused");
            return Err(MicroblogError::Forbidden);
        }
        if !self.storage.delete_user(id).await? {
            return Err(MicroblogError::NotFound("User"));
        }
        info!(actor_id = actor.id, user_id = id, "user deleted");
        Ok(())
    }

    /// Grant admin to the account registered under `email`, if any.
    pub async fn promote_admin(&self, email: &str) -> Result<bool, MicroblogError> {
        let Some(user) = self
            .storage
            .find_user_by_email(&normalize_email(email))
            .await?
        else {
            return Ok(false);
        };
        self.storage.set_admin(user.id, true).await?;
        info!(user_id = user.id, "admin granted");
        Ok(true)
    }
}
