//! Domain models for the course catalog
//!
//! Row types derive `FromRow` and mirror the tables in `migrations/`.
//! Request types (`NewCourse`, `CourseChanges`, ...) carry what callers
//! supply; identities and timestamps are assigned by the store layer.

pub mod comment;
pub mod course;
pub mod instructor;
pub mod validation;

pub use comment::{Comment, NewComment};
pub use course::{Course, CourseAggregate, CourseChanges, InstructorLink, NewCourse, Price};
pub use instructor::{Instructor, NewInstructor};
pub use validation::ValidationError;
