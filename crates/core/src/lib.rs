//! Seismic image pipeline domain primitives.
//!
//! Pure domain logic with no database access: shared id/timestamp types,
//! the core error type, typed image metadata, and the external transform
//! executor that shells out to the image processing tool.

pub mod error;
pub mod metadata;
pub mod transform;
pub mod types;
