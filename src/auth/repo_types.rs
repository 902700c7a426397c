use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                    // unique user ID
    pub full_name: String,           // display name
    pub email: String,               // login identifier, stored lowercase
    #[serde(skip_serializing)]
    pub password_hash: String,       // Argon2 hash, not exposed in JSON
    #[serde(skip_serializing)]
    pub session_key: Option<String>, // current session credential, None when logged out
    pub created_at: OffsetDateTime,  // creation timestamp
}

/// Fields needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}
