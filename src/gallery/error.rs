// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("could not allocate a unique gallery token after {attempts} attempts")]
    TokenSpaceExhausted { attempts: usize },
}

impl GalleryError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
