//! Instructor repository

use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::ConnectionManager;
use crate::error::{CatalogError, QueryResultExt, Result};
use crate::models::{Instructor, NewInstructor, ValidationError};

pub struct InstructorRepo<'a> {
    connections: &'a ConnectionManager,
}

impl<'a> InstructorRepo<'a> {
    pub fn new(connections: &'a ConnectionManager) -> Self {
        Self { connections }
    }

    /// Insert an instructor and return the stored row.
    #[instrument(skip_all, fields(last_name = %new.last_name))]
    pub async fn create(&self, new: NewInstructor) -> Result<Instructor> {
        check_names(&new)?;

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => sqlx::query_as::<_, Instructor>(
                r#"
                INSERT INTO instructors (id, first_name, last_name, degree, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, first_name, last_name, degree, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.degree)
            .bind(Utc::now())
            .fetch_one(conn)
            .await
            .during("instructor.create"),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        let instructor = outcome?;
        debug!(instructor_id = %instructor.id, "instructor created");
        Ok(instructor)
    }

    /// Replace an instructor's names and degree.
    ///
    /// # Errors
    ///
    /// `NotFound` when no instructor has `id`.
    #[instrument(skip_all, fields(instructor_id = %id))]
    pub async fn update(&self, id: Uuid, fields: NewInstructor) -> Result<Instructor> {
        check_names(&fields)?;

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => sqlx::query_as::<_, Instructor>(
                r#"
                UPDATE instructors
                SET first_name = $2, last_name = $3, degree = $4
                WHERE id = $1
                RETURNING id, first_name, last_name, degree, created_at
                "#,
            )
            .bind(id)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .bind(&fields.degree)
            .fetch_optional(conn)
            .await
            .during("instructor.update"),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        let instructor = outcome?.ok_or_else(|| CatalogError::not_found("instructor", id))?;
        debug!("instructor updated");
        Ok(instructor)
    }

    /// Every instructor, ordered by last name then first name.
    pub async fn list(&self) -> Result<Vec<Instructor>> {
        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => sqlx::query_as::<_, Instructor>(
                "SELECT id, first_name, last_name, degree, created_at FROM usp_GetInstructors()",
            )
            .fetch_all(conn)
            .await
            .during("instructor.list"),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);
        outcome
    }

    /// Fetch one instructor.
    pub async fn get(&self, id: Uuid) -> Result<Option<Instructor>> {
        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => sqlx::query_as::<_, Instructor>(
                r#"
                SELECT id, first_name, last_name, degree, created_at
                FROM instructors
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(conn)
            .await
            .during("instructor.get"),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);
        outcome
    }
}

fn check_names(new: &NewInstructor) -> std::result::Result<(), ValidationError> {
    if new.first_name.trim().is_empty() {
        return Err(ValidationError::Empty { field: "first name" });
    }
    if new.last_name.trim().is_empty() {
        return Err(ValidationError::Empty { field: "last name" });
    }
    Ok(())
}
