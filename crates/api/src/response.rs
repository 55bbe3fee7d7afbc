//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Accepted background
//! work additionally carries a human-readable `message`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "message": ..., "data": T }` envelope for `202 Accepted` responses.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse<T: Serialize> {
    pub message: &'static str,
    pub data: T,
}
