//! Course aggregate writes
//!
//! - `plan`: pure staging of the row writes each operation needs
//! - `coordinator`: applies a plan as one transaction on one lease

pub mod coordinator;
pub mod plan;

pub use coordinator::{apply, CourseCoordinator};
pub use plan::{plan_create, plan_delete, plan_update, StagedWrite, UnitOfWork};
