//! Repositories for the rows that hang off a course
//!
//! The course aggregate itself is written by `aggregate::CourseCoordinator`.
//! These cover the rows it associates with or cascades over:
//! - instructors, referenced by course links
//! - comments, removed with their course

pub mod comments;
pub mod instructors;

pub use comments::CommentRepo;
pub use instructors::InstructorRepo;
