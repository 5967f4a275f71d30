// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use super::ids::{BookingId, GalleryToken};

/// Booking form submission. Only `name` is required; the rest default to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBooking {
    pub name: Option<String>,
    pub phone: String,
    pub email: String,
    pub package_name: String,
    pub date: String,
    pub time_slot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: BookingId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub package_name: String,
    pub date: String,
    pub time_slot: String,
    pub gallery_token: GalleryToken,
    pub created_at_ms: u64,
}
