// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Maps gallery ledger references back to files in the [`FileStore`].
//!
//! Resolution runs against a [`StoreSnapshot`] taken once per request, so resolving the same
//! reference twice against the same snapshot always yields the same file. For each bare name the
//! lookup order is:
//!
//! 1. a stored file with exactly that name;
//! 2. a stored `<digits>-<name>` file;
//! 3. any stored file whose name ends with the name.
//!
//! Each step is tried with the name as recorded and then with its sanitized form. Steps 2 and 3
//! scan the snapshot in lexicographic order, so when several uploads share an original name the
//! one with the smallest disambiguator wins. Only legacy entries take these paths; ingested entries
//! record their stored name and resolve to exactly that file or not at all.

use tracing::debug;

use crate::model::{
    split_disambiguated, strip_disambiguator, DisplayReference, NamedRecord, UrlRecord,
};
use crate::store::{sanitize_original_name, FileStore, StoreError, StoreSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPhoto {
    /// Name shown to users and used for archive entries.
    pub display_name: String,
    /// Actual file name in the store.
    pub stored_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub resolved: Vec<ResolvedPhoto>,
    pub total: usize,
}

impl Reconciliation {
    pub fn dropped(&self) -> usize {
        self.total - self.resolved.len()
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    snapshot: StoreSnapshot,
}

impl Reconciler {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_store(store: &FileStore) -> Result<Self, StoreError> {
        Ok(Self::new(store.snapshot()?))
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    pub fn resolve(&self, reference: &DisplayReference) -> Option<ResolvedPhoto> {
        match reference {
            DisplayReference::BareName(name) => self.resolve_bare_reference(name),
            DisplayReference::Named(record) => self.resolve_named(record),
            DisplayReference::Url(record) => self.resolve_url(record),
            DisplayReference::Unrecognized(_) => None,
        }
    }

    /// Resolves every reference in ledger order, silently skipping the ones with no file.
    pub fn reconcile_all<'a, I>(&self, references: I) -> Reconciliation
    where
        I: IntoIterator<Item = &'a DisplayReference>,
    {
        let mut out = Reconciliation::default();
        for reference in references {
            out.total += 1;
            match self.resolve(reference) {
                Some(photo) => out.resolved.push(photo),
                None => debug!(?reference, "gallery reference has no stored file"),
            }
        }
        out
    }

    fn resolve_bare_reference(&self, name: &str) -> Option<ResolvedPhoto> {
        let stored_name = self.find_stored(name)?;
        Some(ResolvedPhoto {
            display_name: strip_disambiguator(name).to_owned(),
            stored_name,
        })
    }

    fn resolve_named(&self, record: &NamedRecord) -> Option<ResolvedPhoto> {
        // Ingested records name their file; the shared store is never scanned for them.
        if let Some(stored) = record.stored.as_deref() {
            return self.find_exact(stored).map(|stored_name| ResolvedPhoto {
                display_name: record.filename.clone(),
                stored_name: stored_name.to_owned(),
            });
        }

        if let Some(stored_name) = self.find_stored(&record.filename) {
            return Some(ResolvedPhoto {
                display_name: record.filename.clone(),
                stored_name,
            });
        }

        let url = record.url.as_deref()?;
        let mut photo = self.resolve_url(&UrlRecord {
            url: url.to_owned(),
        })?;
        if !record.filename.is_empty() {
            photo.display_name = record.filename.clone();
        }
        Some(photo)
    }

    fn resolve_url(&self, record: &UrlRecord) -> Option<ResolvedPhoto> {
        let candidate = record.basename()?;
        let stored_name = self.find_stored(&candidate)?;
        Some(ResolvedPhoto {
            display_name: strip_disambiguator(&candidate).to_owned(),
            stored_name,
        })
    }

    fn find_stored(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }

        let sanitized = sanitize_original_name(name);
        let mut candidates = vec![name];
        if sanitized != name {
            candidates.push(sanitized.as_str());
        }

        candidates
            .iter()
            .find_map(|candidate| self.find_exact(candidate))
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|candidate| self.find_disambiguated(candidate))
            })
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|candidate| self.find_suffix(candidate))
            })
            .map(str::to_owned)
    }

    fn find_exact(&self, name: &str) -> Option<&str> {
        self.snapshot.get(name)
    }

    fn find_disambiguated(&self, name: &str) -> Option<&str> {
        self.snapshot
            .iter()
            .find(|stored| split_disambiguated(stored).is_some_and(|(_, rest)| rest == name))
    }

    fn find_suffix(&self, name: &str) -> Option<&str> {
        self.snapshot.iter().find(|stored| stored.ends_with(name))
    }
}

#[cfg(test)]
mod tests;
