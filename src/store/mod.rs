// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence on disk.
//!
//! Three stores share one data directory layout:
//!
//! - `uploads/` holds photo bytes under disambiguated names ([`FileStore`]).
//! - `galleries/<token>.json` holds each gallery's ordered references ([`GalleryLedger`]).
//! - `bookings.json` holds booking records ([`BookingStore`]).

pub mod bookings;
mod error;
pub mod file_store;
mod fs_util;
pub mod ledger;

pub use bookings::{BookingDraft, BookingStore};
pub use error::StoreError;
pub use file_store::{
    sanitize_original_name, FileStore, PendingUpload, StoreSnapshot, StoredFile,
};
pub(crate) use fs_util::now_millis;
pub use fs_util::WriteDurability;
pub use ledger::{GalleryEntry, GalleryLedger};
