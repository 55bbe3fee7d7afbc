//! Route definitions for earthquake images.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/earthquakes` for per-earthquake image operations.
///
/// ```text
/// POST   /{earthquake_id}/process-image        -> process_image
/// POST   /{earthquake_id}/process-all-images   -> process_all_images
/// GET    /{earthquake_id}/images               -> list_by_earthquake
/// POST   /{earthquake_id}/images/original      -> create_original
/// ```
pub fn earthquake_router() -> Router<AppState> {
    Router::new()
        .route("/{earthquake_id}/process-image", post(images::process_image))
        .route(
            "/{earthquake_id}/process-all-images",
            post(images::process_all_images),
        )
        .route("/{earthquake_id}/images", get(images::list_by_earthquake))
        .route(
            "/{earthquake_id}/images/original",
            post(images::create_original),
        )
}

/// Routes mounted at `/images`.
///
/// ```text
/// GET    /{image_id}                           -> get_by_id
/// ```
pub fn image_router() -> Router<AppState> {
    Router::new().route("/{image_id}", get(images::get_by_id))
}
