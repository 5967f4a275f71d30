// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Gallery operations: booking, ingest, listing and archive download.
//!
//! [`GalleryService`] ties the file store, the gallery ledger and the booking records together.
//! It is synchronous; async callers run it on a blocking thread.

pub mod archive;
mod error;
pub mod ingest;
pub mod issuer;
pub mod reconcile;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::{BookingId, GalleryToken, NewBooking, PublicOrigin};
use crate::store::{
    now_millis, BookingDraft, BookingStore, FileStore, GalleryEntry, GalleryLedger,
    WriteDurability,
};

pub use archive::{archive_entry_names, ArchiveEntry, ArchiveError, ArchivePlan, ArchiveStream};
pub use error::GalleryError;
pub use ingest::{FailedUpload, IngestOutcome, UploadedFile};
pub use issuer::{RandomTokenSource, TokenIssuer, TokenSource};
pub use reconcile::{Reconciler, Reconciliation, ResolvedPhoto};

const GALLERIES_DIR: &str = "galleries";
const GALLERY_NOT_FOUND: &str = "gallery not found";
const NO_PHOTOS_FOUND: &str = "no photos found on server";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoLink {
    pub display_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryListing {
    pub token: GalleryToken,
    pub photos: Vec<PhotoLink>,
    /// Ledger entries with no stored file. Diagnostic only.
    #[serde(skip)]
    pub unresolved: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: BookingId,
    pub gallery_token: GalleryToken,
    pub gallery_url: String,
}

#[derive(Debug, Clone)]
pub struct GalleryService {
    files: FileStore,
    ledger: GalleryLedger,
    bookings: BookingStore,
    issuer: TokenIssuer,
}

impl GalleryService {
    pub fn new(files: FileStore, ledger: GalleryLedger, bookings: BookingStore) -> Self {
        Self {
            files,
            ledger,
            bookings,
            issuer: TokenIssuer::default(),
        }
    }

    /// Lays out a service under `data_dir` (ledger in `galleries/`, bookings file at the top)
    /// with uploads kept in `uploads_dir`. Directories are created on first write.
    pub fn open(
        data_dir: impl AsRef<Path>,
        uploads_dir: impl Into<PathBuf>,
        durability: WriteDurability,
    ) -> Self {
        let data_dir = data_dir.as_ref();
        Self::new(
            FileStore::new(uploads_dir).with_durability(durability),
            GalleryLedger::new(data_dir.join(GALLERIES_DIR)).with_durability(durability),
            BookingStore::new(data_dir).with_durability(durability),
        )
    }

    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.issuer = TokenIssuer::new(source);
        self
    }

    pub fn with_issuer(mut self, issuer: TokenIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn ledger(&self) -> &GalleryLedger {
        &self.ledger
    }

    pub fn bookings(&self) -> &BookingStore {
        &self.bookings
    }

    /// Records a booking and opens an empty gallery for it.
    pub fn create_booking(
        &self,
        input: NewBooking,
        origin: &PublicOrigin,
    ) -> Result<BookingConfirmation, GalleryError> {
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GalleryError::bad_request("name required"))?
            .to_owned();

        let created_at_ms = now_millis();
        let entry = self.issuer.issue(&self.ledger, created_at_ms)?;
        let draft = BookingDraft {
            name,
            phone: input.phone,
            email: input.email,
            package_name: input.package_name,
            date: input.date,
            time_slot: input.time_slot,
        };
        let record = match self
            .bookings
            .insert(draft, entry.token.clone(), created_at_ms)
        {
            Ok(record) => record,
            Err(err) => {
                // A gallery nobody booked would never be handed out.
                if let Err(cleanup) = self.ledger.remove_entry(&entry.token) {
                    warn!(token = %entry.token, error = %cleanup, "orphan gallery left behind");
                }
                return Err(err.into());
            }
        };

        info!(booking = %record.id, token = %record.gallery_token, "booking created");

        Ok(BookingConfirmation {
            booking_id: record.id,
            gallery_url: origin.gallery_url(&record.gallery_token),
            gallery_token: record.gallery_token,
        })
    }

    pub fn ingest(
        &self,
        token: Option<&str>,
        uploads: Vec<UploadedFile>,
        origin: &PublicOrigin,
    ) -> Result<IngestOutcome, GalleryError> {
        ingest::ingest(&self.files, &self.ledger, token, uploads, origin)
    }

    /// Lists the gallery's photos that still have a stored file.
    ///
    /// Fails with `NotFound` for an unknown token and when nothing resolves.
    pub fn list_photos(
        &self,
        token: &str,
        origin: &PublicOrigin,
    ) -> Result<GalleryListing, GalleryError> {
        let (entry, reconciliation) = self.reconcile(token)?;
        let unresolved = reconciliation.dropped();
        let photos = reconciliation
            .resolved
            .into_iter()
            .map(|photo| PhotoLink {
                url: origin.file_url(&photo.stored_name),
                display_name: photo.display_name,
            })
            .collect();

        Ok(GalleryListing {
            token: entry.token,
            photos,
            unresolved,
        })
    }

    /// Resolves the gallery into an archive plan. Nothing is read until the plan is written.
    pub fn prepare_archive(&self, token: &str) -> Result<ArchivePlan, GalleryError> {
        let (entry, reconciliation) = self.reconcile(token)?;
        Ok(ArchivePlan::new(
            entry.token,
            &reconciliation.resolved,
            self.files.clone(),
        ))
    }

    fn reconcile(&self, token: &str) -> Result<(GalleryEntry, Reconciliation), GalleryError> {
        let token =
            GalleryToken::new(token).map_err(|_| GalleryError::not_found(GALLERY_NOT_FOUND))?;
        let entry = self
            .ledger
            .load(&token)?
            .ok_or_else(|| GalleryError::not_found(GALLERY_NOT_FOUND))?;

        let reconciliation = Reconciler::from_store(&self.files)?.reconcile_all(&entry.photos);
        if reconciliation.dropped() > 0 {
            warn!(
                %token,
                dropped = reconciliation.dropped(),
                total = reconciliation.total,
                "gallery references without stored files"
            );
        }
        if reconciliation.resolved.is_empty() {
            return Err(GalleryError::not_found(NO_PHOTOS_FOUND));
        }

        Ok((entry, reconciliation))
    }
}
