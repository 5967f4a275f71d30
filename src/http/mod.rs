// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface: JSON API under `/api`, stored files under `/uploads`.

mod error;
mod handlers;
mod origin;

use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use handlers::UNRESOLVED_HEADER;
pub use origin::{origin_from_headers, RequestOrigin};

use crate::gallery::GalleryService;
use crate::model::{PublicOrigin, UPLOADS_PATH};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    service: GalleryService,
    public_origin: Option<PublicOrigin>,
    max_upload_bytes: usize,
    frontend_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(service: GalleryService) -> Self {
        Self {
            service,
            public_origin: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            frontend_dir: None,
        }
    }

    /// Fixed origin for generated links, ignoring request headers.
    pub fn with_public_origin(mut self, origin: Option<PublicOrigin>) -> Self {
        self.public_origin = origin;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Directory of static pages (`gallery.html`, ...) served for unmatched paths.
    pub fn with_frontend_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.frontend_dir = dir;
        self
    }

    pub fn service(&self) -> &GalleryService {
        &self.service
    }

    pub fn public_origin(&self) -> Option<&PublicOrigin> {
        self.public_origin.as_ref()
    }
}

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.service.files().root());
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([UNRESOLVED_HEADER, header::CONTENT_DISPOSITION]);

    let mut router = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/bookings", post(handlers::create_booking))
        .route("/api/upload", post(handlers::upload))
        .route("/api/galleries/{token}", get(handlers::list_gallery))
        .route("/api/galleries/{token}/zip", get(handlers::download_archive))
        .nest_service(UPLOADS_PATH, uploads);
    if let Some(dir) = &state.frontend_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
