// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Upload ingest: store every uploaded file, then record the batch in the gallery ledger.

use serde::Serialize;
use tracing::{info, warn};

use super::{GalleryError, PhotoLink};
use crate::model::{DisplayReference, GalleryToken, PublicOrigin};
use crate::store::{
    now_millis, FileStore, GalleryLedger, PendingUpload, StoreError, StoredFile,
};

#[derive(Debug)]
pub struct UploadedFile {
    /// File name as sent by the client, before sanitization.
    pub original_name: String,
    body: UploadBody,
}

#[derive(Debug)]
enum UploadBody {
    Bytes(Vec<u8>),
    Staged(PendingUpload),
    Failed(StoreError),
}

impl UploadedFile {
    pub fn new(original_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            original_name: original_name.into(),
            body: UploadBody::Bytes(contents.into()),
        }
    }

    /// Bytes already streamed into the store. Committed only if the batch is accepted.
    pub fn staged(original_name: impl Into<String>, pending: PendingUpload) -> Self {
        Self {
            original_name: original_name.into(),
            body: UploadBody::Staged(pending),
        }
    }

    /// An upload whose bytes could not be written; reported back as failed.
    pub fn failed(original_name: impl Into<String>, err: StoreError) -> Self {
        Self {
            original_name: original_name.into(),
            body: UploadBody::Failed(err),
        }
    }

    fn store(self, files: &FileStore) -> (String, Result<StoredFile, StoreError>) {
        let stored = match self.body {
            UploadBody::Bytes(contents) => files.put(&self.original_name, &contents),
            UploadBody::Staged(pending) => pending.commit(),
            UploadBody::Failed(err) => Err(err),
        };
        (self.original_name, stored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpload {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub token: GalleryToken,
    pub added: Vec<PhotoLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedUpload>,
}

pub(crate) fn ingest(
    files: &FileStore,
    ledger: &GalleryLedger,
    token: Option<&str>,
    uploads: Vec<UploadedFile>,
    origin: &PublicOrigin,
) -> Result<IngestOutcome, GalleryError> {
    let raw_token = token
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| GalleryError::bad_request("token required"))?;
    let token = GalleryToken::new(raw_token)
        .map_err(|err| GalleryError::bad_request(format!("invalid token: {err}")))?;
    if !ledger.contains(&token)? {
        return Err(GalleryError::bad_request("unknown gallery token"));
    }
    if uploads.is_empty() {
        return Err(GalleryError::bad_request("no files uploaded"));
    }

    let uploaded_at_ms = now_millis();
    let mut refs = Vec::with_capacity(uploads.len());
    let mut added = Vec::with_capacity(uploads.len());
    let mut stored_names = Vec::with_capacity(uploads.len());
    let mut failures: Vec<(String, StoreError)> = Vec::new();

    for upload in uploads {
        match upload.store(files) {
            (original_name, Ok(stored)) => {
                added.push(PhotoLink {
                    display_name: original_name.clone(),
                    url: origin.file_url(&stored.name),
                });
                refs.push(DisplayReference::ingested(
                    original_name,
                    stored.name.clone(),
                    uploaded_at_ms,
                ));
                stored_names.push(stored.name);
            }
            (original_name, Err(err)) => {
                warn!(%token, filename = %original_name, %err, "failed to store upload");
                failures.push((original_name, err));
            }
        }
    }

    if refs.is_empty() {
        if let Some((_, err)) = failures.into_iter().next() {
            return Err(err.into());
        }
        return Err(GalleryError::bad_request("no files uploaded"));
    }

    match ledger.append(&token, refs) {
        Ok(Some(_)) => {}
        Ok(None) => {
            discard(files, &stored_names);
            return Err(GalleryError::bad_request("unknown gallery token"));
        }
        Err(err) => {
            discard(files, &stored_names);
            return Err(err.into());
        }
    }

    info!(%token, added = added.len(), failed = failures.len(), "ingested uploads");

    Ok(IngestOutcome {
        token,
        added,
        failed: failures
            .into_iter()
            .map(|(filename, err)| FailedUpload {
                filename,
                error: err.to_string(),
            })
            .collect(),
    })
}

fn discard(files: &FileStore, stored_names: &[String]) {
    for name in stored_names {
        if let Ok(path) = files.path_of(name) {
            if let Err(err) = std::fs::remove_file(&path) {
                warn!(?path, %err, "failed to remove orphaned upload");
            }
        }
    }
}
