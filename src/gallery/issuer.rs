// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Gallery token allocation.
//!
//! A token is 9 bytes rendered as 12 URL-safe base64 characters: 6 random bytes followed by the
//! low 3 bytes of the current millisecond clock. Collisions are still possible, so allocation
//! retries until the ledger accepts a fresh entry.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use tracing::{debug, warn};

use super::GalleryError;
use crate::model::GalleryToken;
use crate::store::{GalleryEntry, GalleryLedger, StoreError};

const DEFAULT_MAX_ATTEMPTS: usize = 16;

pub trait TokenSource: fmt::Debug + Send + Sync {
    /// Produces a candidate token. Candidates that are not valid tokens are skipped.
    fn next_token(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn next_token(&self) -> String {
        let mut bytes = [0u8; 9];
        rand::thread_rng().fill_bytes(&mut bytes[..6]);
        let millis = crate::store::now_millis().to_be_bytes();
        bytes[6..].copy_from_slice(&millis[5..]);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    source: Arc<dyn TokenSource>,
    max_attempts: usize,
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new(Arc::new(RandomTokenSource))
    }
}

impl TokenIssuer {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Creates an empty gallery under a token no other gallery holds.
    pub fn issue(
        &self,
        ledger: &GalleryLedger,
        created_at_ms: u64,
    ) -> Result<GalleryEntry, GalleryError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.source.next_token();
            let token = match GalleryToken::new(candidate.clone()) {
                Ok(token) => token,
                Err(err) => {
                    warn!(%err, candidate = %candidate, "token source produced an invalid token");
                    continue;
                }
            };

            match ledger.create_entry(&token, created_at_ms) {
                Ok(entry) => return Ok(entry),
                Err(StoreError::AlreadyExists { .. }) => {
                    debug!(%token, attempt, "gallery token collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(GalleryError::TokenSpaceExhausted {
            attempts: self.max_attempts,
        })
    }
}
