// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Booking records, kept in a single `bookings.json` document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::fs_util::{self, WriteDurability};
use super::StoreError;
use crate::model::{BookingId, BookingRecord, GalleryToken};

const BOOKINGS_FILENAME: &str = "bookings.json";

/// Validated booking fields; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub package_name: String,
    pub date: String,
    pub time_slot: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BookingsDocument {
    #[serde(default)]
    bookings: Vec<BookingRecord>,
}

#[derive(Debug, Clone)]
pub struct BookingStore {
    root: PathBuf,
    durability: WriteDurability,
    lock: Arc<Mutex<()>>,
}

impl BookingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(BOOKINGS_FILENAME)
    }

    fn read_document(path: &Path) -> Result<BookingsDocument, StoreError> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(BookingsDocument::default())
            }
            Err(source) => return Err(StoreError::io(path, source)),
        };
        serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn insert(
        &self,
        draft: BookingDraft,
        gallery_token: GalleryToken,
        created_at_ms: u64,
    ) -> Result<BookingRecord, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.path();
        let mut doc = Self::read_document(&path)?;

        let next_id = doc
            .bookings
            .iter()
            .map(|booking| booking.id.0)
            .max()
            .unwrap_or(0)
            + 1;

        let record = BookingRecord {
            id: BookingId(next_id),
            name: draft.name,
            phone: draft.phone,
            email: draft.email,
            package_name: draft.package_name,
            date: draft.date,
            time_slot: draft.time_slot,
            gallery_token,
            created_at_ms,
        };
        doc.bookings.push(record.clone());

        let mut bytes = serde_json::to_vec_pretty(&doc).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        bytes.push(b'\n');
        fs_util::write_atomic(&path, &bytes, self.durability)?;

        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<BookingRecord>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Self::read_document(&self.path())?.bookings)
    }
}
