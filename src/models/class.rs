// src/models/class.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'classes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A class member row joined with the users table.
#[derive(Debug, Serialize, FromRow)]
pub struct ClassMember {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

/// DTO for creating or renaming a class.
#[derive(Debug, Deserialize, Validate)]
pub struct ClassRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// DTO for enrolling a user into a class.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub user_id: i64,
}
