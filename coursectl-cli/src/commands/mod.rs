//! Command implementations for the coursectl CLI

pub mod comment;
pub mod course;
pub mod filters;
pub mod instructor;
pub mod paginate;

pub use comment::run_comment;
pub use course::run_course;
pub use instructor::run_instructor;
pub use paginate::run_paginate;

use anyhow::Result;
use serde::Serialize;

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
