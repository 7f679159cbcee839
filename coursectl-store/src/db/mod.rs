//! Database layer - connection lifecycle, migrations and repositories
//!
//! # Design Principles
//!
//! - Every unit of work leases exactly one connection and releases it on
//!   every exit path
//! - Multi-row writes run inside one transaction
//! - No ambient session: callers pass the `ConnectionManager` in

pub mod migrations;
pub mod pool;
pub mod repos;

pub use migrations::run_migrations;
pub use pool::{ConnectionManager, Lease};
pub use repos::{CommentRepo, InstructorRepo};
