pub mod health;
pub mod images;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /earthquakes/{earthquake_id}/process-image        start one transform (202)
/// /earthquakes/{earthquake_id}/process-all-images   start every transform (202)
/// /earthquakes/{earthquake_id}/images               list images
/// /earthquakes/{earthquake_id}/images/original      register original image (201)
///
/// /images/{image_id}                                image with earthquake summary
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/earthquakes", images::earthquake_router())
        .nest("/images", images::image_router())
}
