use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Instructor record from database
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Instructor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub degree: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInstructor {
    pub first_name: String,
    pub last_name: String,
    pub degree: String,
}
