//! Domain rules for user management.

use thiserror::Error;
use uuid::Uuid;

use super::repository::{NewUser, UserRecord, UserRepository};
use crate::config::Secret;

/// Errors surfaced by [`UserService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// User operations over a [`UserRepository`].
///
/// Holds the signing secret on behalf of future token-issuing operations;
/// the secret is never logged.
#[derive(Debug, Clone)]
pub struct UserService {
    repository: UserRepository,
    secret: Secret,
}

impl UserService {
    #[must_use]
    pub fn new(repository: UserRepository, secret: Secret) -> Self {
        Self { repository, secret }
    }

    #[must_use]
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Looks up a user by its textual UUID.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed id, `NotFound` when no row matches,
    /// `Database` on query failure.
    pub async fn get_user(&self, id: &str) -> Result<UserRecord, ServiceError> {
        let id = Uuid::parse_str(id)
            .map_err(|e| ServiceError::InvalidArgument(format!("id: {e}")))?;
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Creates a user after checking required fields.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when email or name is empty, `Database` on insert
    /// failure.
    pub async fn create_user(&self, email: String, name: String) -> Result<UserRecord, ServiceError> {
        if email.is_empty() {
            return Err(ServiceError::InvalidArgument("email is required".to_string()));
        }
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("name is required".to_string()));
        }
        Ok(self.repository.create(&NewUser { email, name }).await?)
    }
}
