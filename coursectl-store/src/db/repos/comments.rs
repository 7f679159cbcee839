//! Comment repository
//!
//! Comments belong to a course and are removed with it. Creating one
//! requires the course to exist.

use chrono::Utc;
use sqlx::PgConnection;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::ConnectionManager;
use crate::error::{CatalogError, QueryResultExt, Result};
use crate::models::{Comment, NewComment, ValidationError};

pub struct CommentRepo<'a> {
    connections: &'a ConnectionManager,
}

impl<'a> CommentRepo<'a> {
    pub fn new(connections: &'a ConnectionManager) -> Self {
        Self { connections }
    }

    /// Attach a comment to an existing course.
    ///
    /// # Errors
    ///
    /// `NotFound` when the course does not exist.
    #[instrument(skip_all, fields(course_id = %new.course_id))]
    pub async fn create(&self, new: NewComment) -> Result<Comment> {
        check_comment(&new)?;

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => insert(conn, &new).await,
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        let comment = outcome?;
        debug!(comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    /// Comments for a course, newest first.
    pub async fn list_for_course(&self, course_id: Uuid) -> Result<Vec<Comment>> {
        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => sqlx::query_as::<_, Comment>(
                r#"
                SELECT id, course_id, student, score, body, created_at
                FROM comments
                WHERE course_id = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(course_id)
            .fetch_all(conn)
            .await
            .during("comment.list"),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);
        outcome
    }
}

async fn insert(conn: &mut PgConnection, new: &NewComment) -> Result<Comment> {
    // INSERT ... SELECT yields no row when the course is missing
    let row = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, course_id, student, score, body, created_at)
        SELECT $1, c.id, $3, $4, $5, $6
        FROM courses c
        WHERE c.id = $2
        RETURNING id, course_id, student, score, body, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.course_id)
    .bind(&new.student)
    .bind(new.score)
    .bind(&new.body)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await
    .during("comment.create")?;

    row.ok_or_else(|| CatalogError::not_found("course", new.course_id))
}

fn check_comment(new: &NewComment) -> std::result::Result<(), ValidationError> {
    if new.student.trim().is_empty() {
        return Err(ValidationError::Empty { field: "student" });
    }
    if new.score < 0 {
        return Err(ValidationError::OutOfRange {
            field: "score",
            min: 0,
            value: new.score.into(),
        });
    }
    Ok(())
}
