//! Dynamic pagination over named procedures
//!
//! - `request`: procedure name, paging controls, filters, ordering hint
//! - `value`: scalar values and schema-less rows
//! - `executor`: the CALL + cursor fetch round trip
//! - `result`: rows plus the procedure's totals

pub mod executor;
pub mod request;
pub mod result;
pub mod value;

pub use executor::{paginate, PaginationExecutor};
pub use request::{FilterSet, PaginationRequest, RESERVED_PARAMETERS};
pub use result::{page_count, PaginationResult};
pub use value::{Record, ScalarValue};
