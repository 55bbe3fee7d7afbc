//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Plain DTOs for inserts and guarded status transitions

pub mod audit;
pub mod earthquake;
pub mod image;
pub mod status;
