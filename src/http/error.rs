// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::gallery::GalleryError;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// JSON error response: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl From<GalleryError> for ApiError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::BadRequest(message) => Self::bad_request(message),
            GalleryError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            err @ (GalleryError::Storage(_) | GalleryError::TokenSpaceExhausted { .. }) => {
                error!(%err, "request failed");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
