// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data types shared by the store, the gallery service and the HTTP layer.

pub mod booking;
pub mod ids;
pub mod origin;
pub mod reference;

pub use booking::{BookingRecord, NewBooking};
pub use ids::{BookingId, GalleryToken, Id, IdError};
pub use origin::{PublicOrigin, UPLOADS_PATH};
pub use reference::{
    split_disambiguated, strip_disambiguator, DisplayReference, NamedRecord, UrlRecord,
    DISAMBIGUATOR_SEPARATOR,
};
