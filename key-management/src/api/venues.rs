//! Venue management API endpoints.
//!
//! - POST /api/v1/venues - Create a venue from a multipart form (admin)
//! - GET /api/v1/venues - List venues, optionally by status (staff)
//! - GET /api/v1/venues/:id - Get venue details (staff)
//! - PUT /api/v1/venues/:id - Update venue details (admin)
//! - DELETE /api/v1/venues/:id - Delete a venue and its images (admin)
//!
//! Venue status is never written here; only the booking lifecycle moves it.

use super::ListQuery;
use crate::auth::{RequireAdmin, RequireStaff};
use crate::server::state::AppState;
use crate::store::StoreError;
use crate::types::{MAX_VENUE_IMAGES, Page, Venue, VenueDetails, VenueId, VenueStatus};
use crate::uploads::{FileStorage, is_image};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use kms_web::{ApiJson, ApiPath, ApiQuery, AppError, WebResult, status};
use serde::Deserialize;

// ============================================================================
// Request Types
// ============================================================================

/// Partial update of a venue's details. Absent fields are kept.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVenueRequest {
    /// New name
    pub name: Option<String>,
    /// New abbreviation
    pub abbreviation: Option<String>,
    /// New block
    pub block: Option<String>,
    /// New capacity
    pub capacity: Option<u32>,
    /// New description
    pub description: Option<String>,
    /// New equipment list (replaces the old one)
    pub equipment: Option<Vec<String>>,
}

impl UpdateVenueRequest {
    fn apply(self, current: VenueDetails) -> VenueDetails {
        VenueDetails {
            name: self.name.unwrap_or(current.name),
            abbreviation: self.abbreviation.unwrap_or(current.abbreviation),
            block: self.block.unwrap_or(current.block),
            capacity: self.capacity.unwrap_or(current.capacity),
            description: self.description.unwrap_or(current.description),
            equipment: self.equipment.unwrap_or(current.equipment),
        }
    }
}

/// An image part, held in memory until the whole form has been validated.
struct ImagePart {
    file_name: String,
    bytes: Bytes,
}

/// Fields collected from the multipart form.
#[derive(Default)]
struct VenueForm {
    name: Option<String>,
    abbreviation: Option<String>,
    block: Option<String>,
    capacity: Option<String>,
    description: Option<String>,
    equipment: Vec<String>,
    images: Vec<ImagePart>,
}

impl VenueForm {
    async fn read(mut multipart: Multipart, max_image_bytes: usize) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "name" => form.name = Some(field.text().await?),
                "abbreviation" => form.abbreviation = Some(field.text().await?),
                "block" => form.block = Some(field.text().await?),
                "capacity" => form.capacity = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "equipment" | "equipment[]" => {
                    let text = field.text().await?;
                    form.equipment.extend(text.split(',').map(ToString::to_string));
                },
                "images" | "image" => {
                    if form.images.len() == MAX_VENUE_IMAGES {
                        return Err(AppError::validation(format!(
                            "A venue can have at most {MAX_VENUE_IMAGES} images"
                        )));
                    }
                    if !is_image(field.content_type()) {
                        return Err(AppError::validation("Only image uploads are allowed"));
                    }
                    let file_name = field.file_name().unwrap_or("image").to_string();
                    let bytes = field.bytes().await?;
                    if bytes.len() > max_image_bytes {
                        return Err(AppError::validation(format!(
                            "Image {file_name} exceeds {max_image_bytes} bytes"
                        )));
                    }
                    if !bytes.is_empty() {
                        form.images.push(ImagePart { file_name, bytes });
                    }
                },
                other => tracing::debug!(field = other, "Ignoring unknown venue form field"),
            }
        }

        Ok(form)
    }

    fn details(&self) -> Result<VenueDetails, AppError> {
        let capacity = match self.capacity.as_deref().map(str::trim) {
            None | Some("") => return Err(AppError::validation("Venue capacity is required")),
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| AppError::validation("Venue capacity must be a positive integer"))?,
        };

        VenueDetails {
            name: self.name.clone().unwrap_or_default(),
            abbreviation: self.abbreviation.clone().unwrap_or_default(),
            block: self.block.clone().unwrap_or_default(),
            capacity,
            description: self.description.clone().unwrap_or_default(),
            equipment: self.equipment.clone(),
        }
        .normalized()
        .map_err(AppError::from)
    }
}

/// Best-effort removal of stored images.
async fn remove_images(files: &dyn FileStorage, paths: &[String]) {
    for path in paths {
        if let Err(err) = files.remove(path).await {
            tracing::warn!(%path, error = %err, "Failed to remove venue image");
        }
    }
}

fn venue_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::missing("Venue"),
        other => other.into(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a venue.
///
/// Admin only. The form is validated completely before any image is stored;
/// stored images are removed again if the venue cannot be inserted.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/venues \
///   -H "Authorization: Bearer <token>" \
///   -F name="Room A" -F abbreviation=RA -F block=B1 -F capacity=40 \
///   -F description="Seminar room" -F equipment="projector,whiteboard" \
///   -F images=@room-a.jpg
/// ```
pub async fn create_venue(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> WebResult<(StatusCode, Json<Venue>)> {
    let form = VenueForm::read(multipart?, state.max_image_bytes).await?;
    let details = form.details()?;

    let mut stored = Vec::with_capacity(form.images.len());
    for image in &form.images {
        match state.files.save(&image.file_name, &image.bytes).await {
            Ok(path) => stored.push(path),
            Err(err) => {
                remove_images(state.files.as_ref(), &stored).await;
                return Err(AppError::internal("Failed to store venue image").with_source(err.into()));
            },
        }
    }

    let venue = Venue::new(details, stored.clone(), state.now());
    match state.storage.insert_venue(venue).await {
        Ok(venue) => {
            tracing::info!(venue_id = %venue.id, name = %venue.name, admin = %admin.id, "Venue created");
            Ok((status::CREATED, Json(venue)))
        },
        Err(err) => {
            remove_images(state.files.as_ref(), &stored).await;
            Err(err.into())
        },
    }
}

/// List venues, newest first.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/v1/venues?status=available&page=0&page_size=20" \
///   -H "Authorization: Bearer <token>"
/// ```
pub async fn list_venues(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> WebResult<Json<Page<Venue>>> {
    let status = query.status::<VenueStatus>()?;
    let page = state.storage.list_venues(status, query.page()).await?;
    Ok(Json(page))
}

/// Get one venue.
pub async fn get_venue(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiPath(venue_id): ApiPath<VenueId>,
) -> WebResult<Json<Venue>> {
    state
        .storage
        .find_venue(venue_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::missing("Venue"))
}

/// Update a venue's details.
///
/// Admin only. Status and images are not editable here.
pub async fn update_venue(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(venue_id): ApiPath<VenueId>,
    ApiJson(request): ApiJson<UpdateVenueRequest>,
) -> WebResult<Json<Venue>> {
    let current = state
        .storage
        .find_venue(venue_id)
        .await?
        .ok_or_else(|| AppError::missing("Venue"))?;

    let details = request.apply(current.details()).normalized()?;
    let updated = state
        .storage
        .update_venue(current.with_details(details, state.now()))
        .await
        .map_err(venue_error)?;

    Ok(Json(updated))
}

/// Delete a venue.
///
/// Admin only. A booked venue cannot be deleted; its keys must be returned
/// first. Image files are removed after the record, failures only logged.
pub async fn delete_venue(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(venue_id): ApiPath<VenueId>,
) -> WebResult<Json<Venue>> {
    let venue = state
        .storage
        .delete_venue(venue_id)
        .await
        .map_err(venue_error)?;

    remove_images(state.files.as_ref(), &venue.images).await;
    tracing::info!(venue_id = %venue.id, admin = %admin.id, "Venue deleted");

    Ok(Json(venue))
}
