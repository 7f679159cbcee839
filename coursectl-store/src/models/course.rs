//! Course aggregate: course row, its price row and instructor links

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Course record from database
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub publication_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Bumped on every update
    pub version: i64,
}

/// Price record, one per course
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Price {
    pub id: Uuid,
    pub course_id: Uuid,
    pub current_price: Decimal,
    pub promotion: Decimal,
}

/// Link row between a course and one of its instructors.
/// The (course, instructor) pair is the natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRow, Serialize)]
pub struct InstructorLink {
    pub course_id: Uuid,
    pub instructor_id: Uuid,
}

/// A course with its price row and linked instructor ids, as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAggregate {
    pub course: Course,
    pub price: Option<Price>,
    pub instructor_ids: Vec<Uuid>,
}

/// Everything needed to create a course aggregate
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub publication_date: NaiveDate,
    pub price: Decimal,
    pub promotion: Decimal,
    pub instructor_ids: Vec<Uuid>,
}

/// Field-level changes to an existing course.
///
/// `None` leaves the stored value alone. `instructor_ids` replaces the whole
/// link set only when it holds at least one id; `Some(vec![])` is treated
/// like `None`.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub price: Option<Decimal>,
    pub promotion: Option<Decimal>,
    pub instructor_ids: Option<Vec<Uuid>>,
    /// When set, the update is refused unless the stored version matches.
    pub expected_version: Option<i64>,
}

impl CourseChanges {
    /// Instructor ids that should replace the current links, if any.
    pub fn replacement_instructors(&self) -> Option<&[Uuid]> {
        self.instructor_ids
            .as_deref()
            .filter(|ids| !ids.is_empty())
    }
}
