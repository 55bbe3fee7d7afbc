//! Handlers for earthquake image processing and lookup.
//!
//! Processing endpoints answer `202 Accepted` as soon as the jobs are
//! submitted; clients poll the image resources for the outcome.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use seismo_core::error::CoreError;
use seismo_core::transform::TransformKind;
use seismo_core::types::DbId;
use seismo_db::models::image::{EarthquakeImage, EarthquakeImageDetail};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{AcceptedResponse, DataResponse};
use crate::state::AppState;

/// Request body for `process-image`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageRequest {
    pub image_url: Option<String>,
    pub processing_type: Option<String>,
}

/// Request body for `process-all-images`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessAllImagesRequest {
    pub image_url: Option<String>,
}

/// Request body for registering an original image.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOriginalImageRequest {
    pub image_url: Option<String>,
}

fn require_image_url(image_url: Option<String>) -> AppResult<String> {
    image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("imageUrl is required".to_string()))
}

/// POST /api/earthquakes/{earthquake_id}/process-image
pub async fn process_image(
    State(state): State<AppState>,
    Path(earthquake_id): Path<DbId>,
    Json(input): Json<ProcessImageRequest>,
) -> AppResult<(StatusCode, Json<AcceptedResponse<EarthquakeImage>>)> {
    let image_url = require_image_url(input.image_url)?;
    let kind: TransformKind = input
        .processing_type
        .as_deref()
        .unwrap_or_default()
        .parse()?;

    let image = state
        .pipeline
        .process_image(earthquake_id, &image_url, kind)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "Image processing started",
            data: image,
        }),
    ))
}

/// POST /api/earthquakes/{earthquake_id}/process-all-images
pub async fn process_all_images(
    State(state): State<AppState>,
    Path(earthquake_id): Path<DbId>,
    Json(input): Json<ProcessAllImagesRequest>,
) -> AppResult<(StatusCode, Json<AcceptedResponse<Vec<EarthquakeImage>>>)> {
    let image_url = require_image_url(input.image_url)?;

    let images = state
        .pipeline
        .process_all_types(earthquake_id, &image_url)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "Image processing started for all types",
            data: images,
        }),
    ))
}

/// POST /api/earthquakes/{earthquake_id}/images/original
///
/// Without `imageUrl` a random placeholder image is recorded.
pub async fn create_original(
    State(state): State<AppState>,
    Path(earthquake_id): Path<DbId>,
    input: Option<Json<CreateOriginalImageRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<EarthquakeImage>>)> {
    let input = input.map(|Json(body)| body).unwrap_or_default();
    let image_url = input.image_url.filter(|url| !url.trim().is_empty());

    let image = state
        .pipeline
        .create_original_image(earthquake_id, image_url)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: image })))
}

/// GET /api/earthquakes/{earthquake_id}/images
pub async fn list_by_earthquake(
    State(state): State<AppState>,
    Path(earthquake_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EarthquakeImage>>>> {
    let images = state.pipeline.images_by_earthquake(earthquake_id).await?;
    Ok(Json(DataResponse { data: images }))
}

/// GET /api/images/{image_id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<Json<DataResponse<EarthquakeImageDetail>>> {
    let image = state
        .pipeline
        .image_by_id(image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;
    Ok(Json(DataResponse { data: image }))
}
