//! User account ports and application service.
//!
//! Owns authentication and password changes. Follows OWASP guidelines for
//! generic error messages and constant-time responses.

use std::sync::Arc;

use async_trait::async_trait;
use netdock_core::{AppError, AppResult};
use netdock_domain::{EmailAddress, RoleId, UserId, validate_password};

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// User record returned by repository queries.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Canonical email address.
    pub email: String,
    /// Display name shown in the portal.
    pub display_name: String,
    /// Argon2id password hash, or `None` for externally provisioned accounts.
    pub password_hash: Option<String>,
    /// Bypasses every role-gate check when set.
    pub is_superuser: bool,
    /// Durable active-role pointer, if one was persisted.
    pub active_role_id: Option<RoleId>,
    /// Number of consecutive failed login attempts.
    pub failed_login_count: i32,
    /// Account is locked until this time, if set.
    pub locked_until: Option<chrono::DateTime<chrono::Utc>>,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Updates the durable active-role pointer in a single atomic write.
    ///
    /// `None` clears the pointer. The update must never be observable
    /// half-applied.
    async fn set_active_role(&self, user_id: UserId, role_id: Option<RoleId>) -> AppResult<()>;

    /// Updates the password hash for a user.
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()>;

    /// Increments the failed login counter and optionally locks the account.
    async fn record_failed_login(&self, user_id: UserId) -> AppResult<()>;

    /// Resets the failed login counter and removes any account lock.
    async fn reset_failed_logins(&self, user_id: UserId) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps domain/application free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    /// Must run in constant time regardless of validity.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

// ---------------------------------------------------------------------------
// Authentication outcome
// ---------------------------------------------------------------------------

/// Result of a login attempt.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Authentication succeeded. Session can be established.
    Authenticated(UserRecord),
    /// Authentication failed. Generic message prevents enumeration.
    Failed,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for user authentication.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
        }
    }

    /// Authenticates a user with email and password.
    ///
    /// Returns `AuthOutcome::Failed` for any failure (malformed or unknown
    /// email, wrong password, locked account) to prevent enumeration.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let Ok(email_address) = EmailAddress::new(email) else {
            // Malformed input gets the same generic outcome as a wrong password.
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        let user = self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?;

        let Some(user) = user else {
            // OWASP: always hash to prevent timing attacks even when user not found.
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        if let Some(locked_until) = user.locked_until
            && chrono::Utc::now() < locked_until
        {
            // Still locked; don't reveal this, just say failed.
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        }

        let Some(ref stored_hash) = user.password_hash else {
            // No password set on this account; fail generically.
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        let password_valid = self.password_hasher.verify_password(password, stored_hash)?;

        if !password_valid {
            self.user_repository.record_failed_login(user.id).await?;
            return Ok(AuthOutcome::Failed);
        }

        self.user_repository.reset_failed_logins(user.id).await?;

        Ok(AuthOutcome::Authenticated(user))
    }

    /// Changes the password for an authenticated user.
    ///
    /// Requires the current password for verification (OWASP Authentication:
    /// change password feature).
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;

        let Some(ref stored_hash) = user.password_hash else {
            return Err(AppError::Validation(
                "no password is set on this account".to_owned(),
            ));
        };

        let current_valid = self
            .password_hasher
            .verify_password(current_password, stored_hash)?;

        if !current_valid {
            return Err(AppError::Unauthorized(
                "current password is incorrect".to_owned(),
            ));
        }

        validate_password(new_password)?;

        let new_hash = self.password_hasher.hash_password(new_password)?;
        self.user_repository
            .update_password(user_id, &new_hash)
            .await
    }

    /// Returns a user record by ID, if it exists.
    pub async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        self.user_repository.find_by_id(user_id).await
    }

    /// Returns a user record by email, if it exists.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.user_repository.find_by_email(email).await
    }
}
