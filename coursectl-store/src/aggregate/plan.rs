//! Staged writes for the course aggregate
//!
//! Planning is pure: given the rows loaded so far and the caller's input,
//! it produces the ordered list of writes one commit must apply. Dependents
//! always come before the course row on delete, and links are deleted
//! before they are re-inserted on update.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Course, CourseChanges, InstructorLink, NewCourse, Price};

/// One row-level write inside a unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    InsertCourse(Course),
    UpdateCourse(Course),
    InsertPrice(Price),
    UpdatePrice(Price),
    InsertInstructorLink(InstructorLink),
    DeleteInstructorLinks { course_id: Uuid },
    DeleteComments { course_id: Uuid },
    DeletePrice { course_id: Uuid },
    DeleteCourse { course_id: Uuid },
}

impl StagedWrite {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsertCourse(_) => "insert_course",
            Self::UpdateCourse(_) => "update_course",
            Self::InsertPrice(_) => "insert_price",
            Self::UpdatePrice(_) => "update_price",
            Self::InsertInstructorLink(_) => "insert_instructor_link",
            Self::DeleteInstructorLinks { .. } => "delete_instructor_links",
            Self::DeleteComments { .. } => "delete_comments",
            Self::DeletePrice { .. } => "delete_price",
            Self::DeleteCourse { .. } => "delete_course",
        }
    }
}

/// Ordered writes committed together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
    writes: Vec<StagedWrite>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, write: StagedWrite) {
        self.writes.push(write);
    }

    pub fn writes(&self) -> &[StagedWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Drop repeated instructor ids, keeping the first occurrence.
pub fn distinct_instructors(ids: &[Uuid]) -> Vec<Uuid> {
    ids.iter().copied().collect::<IndexSet<_>>().into_iter().collect()
}

fn stage_links(work: &mut UnitOfWork, course_id: Uuid, instructor_ids: &[Uuid]) {
    for instructor_id in distinct_instructors(instructor_ids) {
        work.stage(StagedWrite::InsertInstructorLink(InstructorLink {
            course_id,
            instructor_id,
        }));
    }
}

/// Course row, its price row, then one link per distinct instructor.
pub fn plan_create(
    new: &NewCourse,
    course_id: Uuid,
    price_id: Uuid,
    now: DateTime<Utc>,
) -> (Course, UnitOfWork) {
    let course = Course {
        id: course_id,
        title: new.title.clone(),
        description: new.description.clone(),
        publication_date: new.publication_date,
        created_at: now,
        modified_at: None,
        version: 1,
    };

    let mut work = UnitOfWork::new();
    work.stage(StagedWrite::InsertCourse(course.clone()));
    work.stage(StagedWrite::InsertPrice(Price {
        id: price_id,
        course_id,
        current_price: new.price,
        promotion: new.promotion,
    }));
    stage_links(&mut work, course_id, &new.instructor_ids);

    (course, work)
}

/// Overwrite supplied fields only. A missing price row is created with
/// unsupplied amounts at zero; links are replaced only by a non-empty list.
pub fn plan_update(
    existing: &Course,
    existing_price: Option<&Price>,
    changes: &CourseChanges,
    new_price_id: Uuid,
    now: DateTime<Utc>,
) -> (Course, UnitOfWork) {
    let course = Course {
        id: existing.id,
        title: changes.title.clone().unwrap_or_else(|| existing.title.clone()),
        description: changes
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone()),
        publication_date: changes.publication_date.unwrap_or(existing.publication_date),
        created_at: existing.created_at,
        modified_at: Some(now),
        version: existing.version + 1,
    };

    let mut work = UnitOfWork::new();
    work.stage(StagedWrite::UpdateCourse(course.clone()));

    match existing_price {
        Some(price) => work.stage(StagedWrite::UpdatePrice(Price {
            id: price.id,
            course_id: existing.id,
            current_price: changes.price.unwrap_or(price.current_price),
            promotion: changes.promotion.unwrap_or(price.promotion),
        })),
        None => work.stage(StagedWrite::InsertPrice(Price {
            id: new_price_id,
            course_id: existing.id,
            current_price: changes.price.unwrap_or(Decimal::ZERO),
            promotion: changes.promotion.unwrap_or(Decimal::ZERO),
        })),
    }

    if let Some(instructor_ids) = changes.replacement_instructors() {
        work.stage(StagedWrite::DeleteInstructorLinks {
            course_id: existing.id,
        });
        stage_links(&mut work, existing.id, instructor_ids);
    }

    (course, work)
}

/// Dependents first, the course row last.
pub fn plan_delete(course_id: Uuid) -> UnitOfWork {
    let mut work = UnitOfWork::new();
    work.stage(StagedWrite::DeleteInstructorLinks { course_id });
    work.stage(StagedWrite::DeleteComments { course_id });
    work.stage(StagedWrite::DeletePrice { course_id });
    work.stage(StagedWrite::DeleteCourse { course_id });
    work
}
