//! Data access for the `users` table.

use sqlx::postgres::PgPool;
use uuid::Uuid;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
}

/// Queries the `users` table through a handle to the shared pool.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches a user by primary key.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error on connection or query failure.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT id, email, name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Inserts a user with a fresh v4 id and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error on connection or constraint failure.
    pub async fn create(&self, user: &NewUser) -> Result<UserRecord, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) RETURNING id, email, name",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
    }
}
