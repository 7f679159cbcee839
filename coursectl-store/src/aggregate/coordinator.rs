//! Course aggregate persistence
//!
//! Create, update and delete each run as one transaction on one leased
//! connection. The writes are planned first (see `plan`) and then applied
//! in order; nothing is visible to other sessions until the commit.

use chrono::Utc;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::plan::{plan_create, plan_delete, plan_update, StagedWrite, UnitOfWork};
use crate::db::ConnectionManager;
use crate::error::{CatalogError, QueryResultExt, Result};
use crate::models::{Course, CourseAggregate, CourseChanges, NewCourse, Price, ValidationError};

const CREATE: &str = "course.create";
const UPDATE: &str = "course.update";
const DELETE: &str = "course.delete";
const LOAD: &str = "course.load";

/// Writes course aggregates through the connection manager it is given.
pub struct CourseCoordinator<'a> {
    connections: &'a ConnectionManager,
}

impl<'a> CourseCoordinator<'a> {
    pub fn new(connections: &'a ConnectionManager) -> Self {
        Self { connections }
    }

    /// Create a course, its price row and one link per distinct instructor.
    ///
    /// # Errors
    ///
    /// - `QueryExecutionFailed` if any insert fails (e.g. an unknown
    ///   instructor id); nothing is persisted
    /// - `PersistenceFailed` if the commit would affect no rows
    #[instrument(skip_all, fields(title = %new.title))]
    pub async fn create(&self, new: NewCourse) -> Result<Uuid> {
        check_title(&new.title)?;

        let (course, work) = plan_create(&new, Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        debug!(course_id = %course.id, writes = work.len(), "create planned");

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => commit_create(conn, course.id, &work).await,
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        let affected = outcome?;
        info!(course_id = %course.id, affected, "course created");
        Ok(course.id)
    }

    /// Apply field-level changes to an existing course.
    ///
    /// Absent fields keep their stored values. Links are replaced only when
    /// `changes.instructor_ids` holds at least one id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the course does not exist
    /// - `Conflict` if `expected_version` is set and differs from the stored one
    /// - `QueryExecutionFailed` if a statement fails; nothing is persisted
    #[instrument(skip_all, fields(course_id = %course_id))]
    pub async fn update(&self, course_id: Uuid, changes: CourseChanges) -> Result<Course> {
        if let Some(title) = &changes.title {
            check_title(title)?;
        }

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => commit_update(conn, course_id, &changes).await,
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        match outcome {
            Ok((course, affected)) => {
                info!(version = course.version, affected, "course updated");
                Ok(course)
            }
            Err(e) => {
                warn!(error = %e, "course update rolled back");
                Err(e)
            }
        }
    }

    /// Delete a course with its links, comments and price row.
    ///
    /// # Errors
    ///
    /// `NotFound` if the course does not exist; no rows are touched.
    #[instrument(skip_all, fields(course_id = %course_id))]
    pub async fn delete(&self, course_id: Uuid) -> Result<()> {
        let work = plan_delete(course_id);

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => commit_delete(conn, course_id, &work).await,
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        let affected = outcome?;
        info!(affected, "course deleted");
        Ok(())
    }

    /// Read a course with its price row and instructor ids.
    pub async fn load(&self, course_id: Uuid) -> Result<Option<CourseAggregate>> {
        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => load_aggregate(conn, course_id).await.during(LOAD),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);
        outcome
    }
}

async fn commit_create(conn: &mut PgConnection, course_id: Uuid, work: &UnitOfWork) -> Result<u64> {
    let mut tx = conn.begin().await.during(CREATE)?;
    let affected: u64 = apply(&mut *tx, work).await.during(CREATE)?.iter().sum();
    if affected == 0 {
        return Err(CatalogError::PersistenceFailed {
            operation: CREATE,
            id: course_id,
        });
    }
    tx.commit().await.during(CREATE)?;
    Ok(affected)
}

async fn commit_update(
    conn: &mut PgConnection,
    course_id: Uuid,
    changes: &CourseChanges,
) -> Result<(Course, u64)> {
    let mut tx = conn.begin().await.during(UPDATE)?;

    let existing = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, publication_date, created_at, modified_at, version
        FROM courses
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await
    .during(UPDATE)?
    .ok_or_else(|| CatalogError::not_found("course", course_id))?;

    if let Some(expected) = changes.expected_version {
        if expected != existing.version {
            return Err(CatalogError::Conflict {
                id: course_id,
                expected,
                actual: existing.version,
            });
        }
    }

    let price = sqlx::query_as::<_, Price>(
        r#"
        SELECT id, course_id, current_price, promotion
        FROM prices
        WHERE course_id = $1
        FOR UPDATE
        "#,
    )
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await
    .during(UPDATE)?;

    let (course, work) =
        plan_update(&existing, price.as_ref(), changes, Uuid::new_v4(), Utc::now());
    debug!(
        writes = work.len(),
        replaces_links = changes.replacement_instructors().is_some(),
        "update planned"
    );

    let affected: u64 = apply(&mut *tx, &work).await.during(UPDATE)?.iter().sum();
    if affected == 0 {
        return Err(CatalogError::PersistenceFailed {
            operation: UPDATE,
            id: course_id,
        });
    }
    tx.commit().await.during(UPDATE)?;
    Ok((course, affected))
}

async fn commit_delete(conn: &mut PgConnection, course_id: Uuid, work: &UnitOfWork) -> Result<u64> {
    let mut tx = conn.begin().await.during(DELETE)?;
    let counts = apply(&mut *tx, work).await.during(DELETE)?;

    // The course row goes last; if it was not there the dependent deletes
    // are rolled back with the transaction.
    if counts.last().copied().unwrap_or(0) == 0 {
        return Err(CatalogError::not_found("course", course_id));
    }
    let affected: u64 = counts.iter().sum();
    tx.commit().await.during(DELETE)?;
    Ok(affected)
}

/// Apply staged writes in order, returning each write's affected-row count.
///
/// Runs on whatever connection it is handed; callers own the transaction.
pub async fn apply(
    conn: &mut PgConnection,
    work: &UnitOfWork,
) -> std::result::Result<Vec<u64>, sqlx::Error> {
    let mut counts = Vec::with_capacity(work.len());
    for write in work.writes() {
        let affected = apply_write(conn, write).await?;
        debug!(write = write.kind(), affected, "staged write applied");
        counts.push(affected);
    }
    Ok(counts)
}

async fn apply_write(
    conn: &mut PgConnection,
    write: &StagedWrite,
) -> std::result::Result<u64, sqlx::Error> {
    let result = match write {
        StagedWrite::InsertCourse(c) => {
            sqlx::query(
                r#"
                INSERT INTO courses
                    (id, title, description, publication_date, created_at, modified_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(c.id)
            .bind(&c.title)
            .bind(&c.description)
            .bind(c.publication_date)
            .bind(c.created_at)
            .bind(c.modified_at)
            .bind(c.version)
            .execute(&mut *conn)
            .await?
        }
        StagedWrite::UpdateCourse(c) => {
            sqlx::query(
                r#"
                UPDATE courses
                SET title = $2, description = $3, publication_date = $4,
                    modified_at = $5, version = $6
                WHERE id = $1
                "#,
            )
            .bind(c.id)
            .bind(&c.title)
            .bind(&c.description)
            .bind(c.publication_date)
            .bind(c.modified_at)
            .bind(c.version)
            .execute(&mut *conn)
            .await?
        }
        StagedWrite::InsertPrice(p) => {
            sqlx::query(
                r#"
                INSERT INTO prices (id, course_id, current_price, promotion)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(p.id)
            .bind(p.course_id)
            .bind(p.current_price)
            .bind(p.promotion)
            .execute(&mut *conn)
            .await?
        }
        StagedWrite::UpdatePrice(p) => {
            sqlx::query("UPDATE prices SET current_price = $2, promotion = $3 WHERE id = $1")
                .bind(p.id)
                .bind(p.current_price)
                .bind(p.promotion)
                .execute(&mut *conn)
                .await?
        }
        StagedWrite::InsertInstructorLink(link) => {
            sqlx::query("INSERT INTO course_instructors (course_id, instructor_id) VALUES ($1, $2)")
                .bind(link.course_id)
                .bind(link.instructor_id)
                .execute(&mut *conn)
                .await?
        }
        StagedWrite::DeleteInstructorLinks { course_id } => {
            sqlx::query("DELETE FROM course_instructors WHERE course_id = $1")
                .bind(*course_id)
                .execute(&mut *conn)
                .await?
        }
        StagedWrite::DeleteComments { course_id } => {
            sqlx::query("DELETE FROM comments WHERE course_id = $1")
                .bind(*course_id)
                .execute(&mut *conn)
                .await?
        }
        StagedWrite::DeletePrice { course_id } => {
            sqlx::query("DELETE FROM prices WHERE course_id = $1")
                .bind(*course_id)
                .execute(&mut *conn)
                .await?
        }
        StagedWrite::DeleteCourse { course_id } => {
            sqlx::query("DELETE FROM courses WHERE id = $1")
                .bind(*course_id)
                .execute(&mut *conn)
                .await?
        }
    };
    Ok(result.rows_affected())
}

async fn load_aggregate(
    conn: &mut PgConnection,
    course_id: Uuid,
) -> std::result::Result<Option<CourseAggregate>, sqlx::Error> {
    let course = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, publication_date, created_at, modified_at, version
        FROM courses
        WHERE id = $1
        "#,
    )
    .bind(course_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(course) = course else {
        return Ok(None);
    };

    let price = sqlx::query_as::<_, Price>(
        "SELECT id, course_id, current_price, promotion FROM prices WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_optional(&mut *conn)
    .await?;

    let instructor_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT instructor_id FROM course_instructors WHERE course_id = $1 ORDER BY instructor_id",
    )
    .bind(course_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(CourseAggregate {
        course,
        price,
        instructor_ids,
    }))
}

fn check_title(title: &str) -> std::result::Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::Empty { field: "title" });
    }
    Ok(())
}
