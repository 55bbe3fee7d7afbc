//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod earthquake_image_repo;
pub mod earthquake_repo;

pub use audit_repo::AuditRepo;
pub use earthquake_image_repo::EarthquakeImageRepo;
pub use earthquake_repo::EarthquakeRepo;
