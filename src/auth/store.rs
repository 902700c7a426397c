use axum::async_trait;
use sqlx::PgPool;

use crate::auth::error::AuthError;
use crate::auth::repo_types::{NewUser, User};

/// Persistence seam for user records. Implementations must apply each call
/// atomically at single-record granularity; the auth core holds no locks of
/// its own across store operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_session_key(&self, key: &str) -> Result<Option<User>, AuthError>;

    /// Insert a new user. Fails with [`AuthError::DuplicateEmail`] when the
    /// email is already taken.
    async fn create(&self, new: NewUser) -> Result<User, AuthError>;

    /// Persist mutated fields of an existing record, keyed by `id`.
    async fn update(&self, user: &User) -> Result<(), AuthError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, session_key, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_session_key(&self, key: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, session_key, created_at
            FROM users
            WHERE session_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, AuthError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, full_name, email, password_hash, session_key, created_at
            "#,
        )
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AuthError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, email = $3, password_hash = $4, session_key = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.session_key)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
