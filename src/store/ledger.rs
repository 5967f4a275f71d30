// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Gallery ledger: one JSON document per gallery token under `<data>/galleries/`.
//!
//! Token uniqueness is enforced by creating the document with `create_new`. Every read and write
//! goes through a lock shared by all clones of a [`GalleryLedger`], so appends from concurrent
//! uploads are applied one after another instead of overwriting each other.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::fs_util::{self, WriteDurability};
use super::StoreError;
use crate::model::{DisplayReference, GalleryToken};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    pub token: GalleryToken,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub photos: Vec<DisplayReference>,
}

#[derive(Debug, Clone)]
pub struct GalleryLedger {
    root: PathBuf,
    durability: WriteDurability,
    lock: Arc<Mutex<()>>,
}

impl GalleryLedger {
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

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, token: &GalleryToken) -> PathBuf {
        self.root.join(format!("{}.json", token.as_str()))
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts an empty gallery for `token`.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when the token is taken.
    pub fn create_entry(
        &self,
        token: &GalleryToken,
        created_at_ms: u64,
    ) -> Result<GalleryEntry, StoreError> {
        let _guard = self.guard();
        fs_util::create_dir_all(&self.root)?;

        let entry = GalleryEntry {
            token: token.clone(),
            created_at_ms,
            photos: Vec::new(),
        };
        let path = self.entry_path(token);
        let bytes = encode(&path, &entry)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists { path });
            }
            Err(source) => return Err(StoreError::io(&path, source)),
        };

        let written = file.write_all(&bytes).and_then(|()| {
            if self.durability == WriteDurability::Durable {
                file.sync_all()
            } else {
                Ok(())
            }
        });
        drop(file);

        if let Err(source) = written {
            let _ = fs::remove_file(&path);
            return Err(StoreError::io(&path, source));
        }
        if self.durability == WriteDurability::Durable {
            fs_util::sync_dir(&self.root)?;
        }

        Ok(entry)
    }

    pub fn load(&self, token: &GalleryToken) -> Result<Option<GalleryEntry>, StoreError> {
        let _guard = self.guard();
        self.load_unlocked(token)
    }

    fn load_unlocked(&self, token: &GalleryToken) -> Result<Option<GalleryEntry>, StoreError> {
        let path = self.entry_path(token);
        fs_util::refuse_symlink(&path)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::io(&path, source)),
        };
        let entry = serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        Ok(Some(entry))
    }

    /// Deletes the gallery document for `token`; an absent document is not an error.
    pub fn remove_entry(&self, token: &GalleryToken) -> Result<(), StoreError> {
        let _guard = self.guard();
        let path = self.entry_path(token);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(StoreError::io(&path, source)),
        }
        if self.durability == WriteDurability::Durable {
            fs_util::sync_dir(&self.root)?;
        }
        Ok(())
    }

    pub fn contains(&self, token: &GalleryToken) -> Result<bool, StoreError> {
        Ok(self.load(token)?.is_some())
    }

    /// Appends `refs` to the gallery's list in one read-modify-write under the ledger lock.
    ///
    /// Returns `None` when the token is unknown; nothing is written in that case.
    pub fn append(
        &self,
        token: &GalleryToken,
        refs: impl IntoIterator<Item = DisplayReference>,
    ) -> Result<Option<GalleryEntry>, StoreError> {
        let _guard = self.guard();
        let Some(mut entry) = self.load_unlocked(token)? else {
            return Ok(None);
        };

        let before = entry.photos.len();
        entry.photos.extend(refs);
        if entry.photos.len() == before {
            return Ok(Some(entry));
        }

        let path = self.entry_path(token);
        let bytes = encode(&path, &entry)?;
        fs_util::write_atomic(&path, &bytes, self.durability)?;
        Ok(Some(entry))
    }
}

fn encode(path: &Path, entry: &GalleryEntry) -> Result<Vec<u8>, StoreError> {
    let mut bytes = serde_json::to_vec_pretty(entry).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use rstest::{fixture, rstest};

    use super::GalleryLedger;
    use crate::model::{DisplayReference, GalleryToken};
    use crate::store::StoreError;

    struct LedgerTestCtx {
        _tmp: tempfile::TempDir,
        ledger: GalleryLedger,
        token: GalleryToken,
    }

    #[fixture]
    fn ctx() -> LedgerTestCtx {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = GalleryLedger::new(tmp.path().join("galleries"));
        LedgerTestCtx {
            _tmp: tmp,
            ledger,
            token: GalleryToken::new("abc123").unwrap(),
        }
    }

    #[rstest]
    fn create_entry_is_empty_and_unique(ctx: LedgerTestCtx) {
        let entry = ctx.ledger.create_entry(&ctx.token, 7).unwrap();
        assert!(entry.photos.is_empty());
        assert_eq!(entry.created_at_ms, 7);
        assert!(ctx.ledger.contains(&ctx.token).unwrap());

        let err = ctx.ledger.create_entry(&ctx.token, 8).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(ctx.ledger.load(&ctx.token).unwrap().unwrap().created_at_ms, 7);
    }

    #[rstest]
    fn removed_entry_frees_the_token(ctx: LedgerTestCtx) {
        ctx.ledger.create_entry(&ctx.token, 7).unwrap();
        ctx.ledger.remove_entry(&ctx.token).unwrap();
        assert!(!ctx.ledger.contains(&ctx.token).unwrap());

        ctx.ledger.remove_entry(&ctx.token).unwrap();
        assert_eq!(ctx.ledger.create_entry(&ctx.token, 9).unwrap().created_at_ms, 9);
    }

    #[rstest]
    fn load_unknown_token_is_none(ctx: LedgerTestCtx) {
        assert_eq!(ctx.ledger.load(&ctx.token).unwrap(), None);
        assert_eq!(
            ctx.ledger
                .append(&ctx.token, [DisplayReference::bare("a.jpg")])
                .unwrap(),
            None
        );
        assert!(!ctx.ledger.entry_path(&ctx.token).exists());
    }

    #[rstest]
    fn append_preserves_order(ctx: LedgerTestCtx) {
        ctx.ledger.create_entry(&ctx.token, 0).unwrap();
        ctx.ledger
            .append(&ctx.token, [DisplayReference::bare("a.jpg")])
            .unwrap();
        let entry = ctx
            .ledger
            .append(
                &ctx.token,
                [
                    DisplayReference::bare("b.jpg"),
                    DisplayReference::ingested("c.jpg", "3-c.jpg", 3),
                ],
            )
            .unwrap()
            .unwrap();

        assert_eq!(
            entry.photos,
            vec![
                DisplayReference::bare("a.jpg"),
                DisplayReference::bare("b.jpg"),
                DisplayReference::ingested("c.jpg", "3-c.jpg", 3),
            ]
        );
        assert_eq!(ctx.ledger.load(&ctx.token).unwrap().unwrap(), entry);
    }

    #[rstest]
    fn reads_legacy_documents(ctx: LedgerTestCtx) {
        std::fs::create_dir_all(ctx.ledger.root()).unwrap();
        std::fs::write(
            ctx.ledger.entry_path(&ctx.token),
            r#"{"token":"abc123","photos":["a.jpg",{"filename":"b.jpg"},{"url":"http://h/uploads/1-c.jpg"}]}"#,
        )
        .unwrap();

        let entry = ctx.ledger.load(&ctx.token).unwrap().unwrap();
        assert_eq!(entry.created_at_ms, 0);
        assert_eq!(entry.photos.len(), 3);
    }

    #[rstest]
    fn corrupt_document_is_a_json_error(ctx: LedgerTestCtx) {
        std::fs::create_dir_all(ctx.ledger.root()).unwrap();
        std::fs::write(ctx.ledger.entry_path(&ctx.token), b"{not json").unwrap();
        assert!(matches!(
            ctx.ledger.load(&ctx.token),
            Err(StoreError::Json { .. })
        ));
    }

    #[rstest]
    fn concurrent_appends_do_not_lose_updates(ctx: LedgerTestCtx) {
        ctx.ledger.create_entry(&ctx.token, 0).unwrap();
        let ledger = Arc::new(ctx.ledger.clone());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = ledger.clone();
                let token = ctx.token.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        ledger
                            .append(&token, [DisplayReference::bare(format!("{worker}-{i}.jpg"))])
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entry = ctx.ledger.load(&ctx.token).unwrap().unwrap();
        assert_eq!(entry.photos.len(), 80);
    }
}
