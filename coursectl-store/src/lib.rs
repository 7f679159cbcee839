//! Course catalog persistence over PostgreSQL
//!
//! Three pieces, all driven by an explicit [`ConnectionManager`] handle:
//!
//! - [`db`]: connection leasing, migrations and the side repositories
//! - [`pagination`]: paged calls to named procedures with open-ended filters,
//!   returning schema-less rows plus the procedure's totals
//! - [`aggregate`]: create, update and delete of a course with its price row,
//!   instructor links and comments, each as a single transaction

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;

pub use aggregate::CourseCoordinator;
pub use config::StoreConfig;
pub use db::{run_migrations, CommentRepo, ConnectionManager, InstructorRepo, Lease};
pub use error::{CatalogError, Result};
pub use models::{
    Comment, Course, CourseAggregate, CourseChanges, Instructor, NewComment, NewCourse,
    NewInstructor, Price, ValidationError,
};
pub use pagination::{
    paginate, FilterSet, PaginationExecutor, PaginationRequest, PaginationResult, Record,
    ScalarValue,
};
