// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::ApiError;
use super::origin::RequestOrigin;
use super::AppState;
use crate::gallery::{BookingConfirmation, GalleryError, IngestOutcome, UploadedFile};
use crate::model::NewBooking;
use crate::store::FileStore;

pub const UNRESOLVED_HEADER: HeaderName = HeaderName::from_static("x-gallery-unresolved");
const TOKEN_FIELD: &str = "token";
const DEFAULT_FILE_NAME: &str = "file";

#[derive(Debug, Serialize)]
pub struct Health {
    ok: bool,
}

pub async fn health() -> Json<Health> {
    Json(Health { ok: true })
}

/// Runs synchronous work on the blocking pool.
async fn unblock<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op).await.map_err(|err| {
        error!(%err, "blocking task failed");
        ApiError::internal()
    })
}

/// Runs a synchronous gallery operation on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, GalleryError> + Send + 'static,
    T: Send + 'static,
{
    unblock(op).await?.map_err(ApiError::from)
}

pub async fn create_booking(
    State(state): State<AppState>,
    RequestOrigin(origin): RequestOrigin,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<Json<BookingConfirmation>, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let service = state.service().clone();
    let confirmation = blocking(move || service.create_booking(input, &origin)).await?;
    Ok(Json(confirmation))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    token: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    RequestOrigin(origin): RequestOrigin,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<IngestOutcome>, ApiError> {
    let mut token = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if let Some(file_name) = field.file_name() {
            let original_name = client_file_name(file_name);
            files.push(stage_upload(state.service().files(), original_name, field).await?);
        } else if field.name() == Some(TOKEN_FIELD) {
            token = Some(field.text().await.map_err(multipart_error)?);
        }
    }

    let token = token.or(query.token);
    let service = state.service().clone();
    let outcome = blocking(move || service.ingest(token.as_deref(), files, &origin)).await?;
    Ok(Json(outcome))
}

pub async fn list_gallery(
    State(state): State<AppState>,
    RequestOrigin(origin): RequestOrigin,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let service = state.service().clone();
    let listing = blocking(move || service.list_photos(&token, &origin)).await?;
    let unresolved = HeaderValue::from(listing.unresolved);
    Ok(([(UNRESOLVED_HEADER, unresolved)], Json(listing)).into_response())
}

pub async fn download_archive(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let service = state.service().clone();
    let plan = blocking(move || service.prepare_archive(&token)).await?;

    let disposition = format!("attachment; filename=\"{}\"", plan.file_name());
    let disposition = HeaderValue::try_from(disposition).map_err(|err| {
        error!(%err, "archive file name is not a valid header value");
        ApiError::internal()
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(plan.into_stream()),
    )
        .into_response())
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Streams one file field into the store chunk by chunk.
///
/// A store failure marks just this file as failed; a broken request body fails the request.
async fn stage_upload(
    files: &FileStore,
    original_name: String,
    mut field: Field<'_>,
) -> Result<UploadedFile, ApiError> {
    let store = files.clone();
    let name = original_name.clone();
    let mut pending = match unblock(move || store.begin(&name)).await? {
        Ok(pending) => pending,
        Err(err) => return Ok(UploadedFile::failed(original_name, err)),
    };

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let written = unblock(move || pending.write(&chunk).map(|()| pending)).await?;
        pending = match written {
            Ok(pending) => pending,
            Err(err) => return Ok(UploadedFile::failed(original_name, err)),
        };
    }

    Ok(UploadedFile::staged(original_name, pending))
}

/// Last path component of a client-supplied file name. Browsers on some platforms send full paths.
fn client_file_name(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() {
        DEFAULT_FILE_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::client_file_name;

    #[rstest]
    #[case("photo.jpg", "photo.jpg")]
    #[case("C:\\Users\\asha\\IMG 001.JPG", "IMG 001.JPG")]
    #[case("dir/sub/a.png", "a.png")]
    #[case("dir/", "file")]
    #[case("  ", "file")]
    fn client_file_name_keeps_last_component(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(client_file_name(raw), expected);
    }
}
