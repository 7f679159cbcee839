//! Student comments on a course

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Comment record from database
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub student: String,
    pub score: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub course_id: Uuid,
    pub student: String,
    pub score: i32,
    pub body: String,
}
