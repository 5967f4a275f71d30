// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Photo bytes on disk.
//!
//! Every upload is written to `<root>/<millis>-<sanitized original name>`. The millisecond
//! disambiguator is strictly increasing per store handle, and the final name is
//! claimed without overwriting, so two uploads can never share a stored name even when they share
//! an original name and land in the same millisecond. Bytes are staged in a hidden temp file first,
//! so listings never see a half-written upload.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::fs_util::{self, WriteDurability};
use super::StoreError;
use crate::model::DISAMBIGUATOR_SEPARATOR;

const MAX_SANITIZED_NAME_BYTES: usize = 200;
const MAX_PUT_ATTEMPTS: usize = 32;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub original_name: String,
    pub disambiguator: u64,
    pub len: u64,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    durability: WriteDurability,
    last_disambiguator: Arc<AtomicU64>,
}

/// Point-in-time listing of the stored names, in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    names: BTreeSet<String>,
}

impl StoreSnapshot {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Makes a client-supplied file name safe to embed in a stored name and a URL path segment.
///
/// Whitespace becomes `_` (as uploads always did); path separators and control characters are
/// replaced the same way. Over-long names keep their tail so the extension survives.
pub fn sanitize_original_name(original: &str) -> String {
    let mut out: String = original
        .chars()
        .map(|ch| {
            if ch.is_whitespace() || ch.is_control() || matches!(ch, '/' | '\\') {
                '_'
            } else {
                ch
            }
        })
        .collect();

    if out.is_empty() {
        out.push_str("file");
    }

    if out.len() > MAX_SANITIZED_NAME_BYTES {
        let mut cut = out.len() - MAX_SANITIZED_NAME_BYTES;
        while !out.is_char_boundary(cut) {
            cut += 1;
        }
        out.drain(..cut);
    }

    out
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
            last_disambiguator: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn next_disambiguator(&self) -> u64 {
        let now = fs_util::now_millis();
        let prev = self
            .last_disambiguator
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev.saturating_add(1)))
            })
            .unwrap_or(now);
        now.max(prev.saturating_add(1))
    }

    /// Writes `contents` under a fresh disambiguated name derived from `original_name`.
    pub fn put(&self, original_name: &str, contents: &[u8]) -> Result<StoredFile, StoreError> {
        let mut pending = self.begin(original_name)?;
        pending.write(contents)?;
        pending.commit()
    }

    /// Starts an upload that is written in pieces. The bytes go to a hidden temp file that is
    /// invisible to listings until [`PendingUpload::commit`]; dropping the upload removes it.
    pub fn begin(&self, original_name: &str) -> Result<PendingUpload, StoreError> {
        fs_util::create_dir_all(&self.root)?;

        for _ in 0..MAX_PUT_ATTEMPTS {
            let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
            let temp_path = self.root.join(format!(
                "{}upload.{}.{seq}",
                fs_util::TEMP_PREFIX,
                std::process::id()
            ));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
            {
                Ok(file) => {
                    return Ok(PendingUpload {
                        store: self.clone(),
                        original_name: original_name.to_owned(),
                        temp_path,
                        file: Some(file),
                        len: 0,
                        committed: false,
                    })
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StoreError::io(&temp_path, source)),
            }
        }

        Err(StoreError::AlreadyExists {
            path: self.root.join(format!("{}upload.*", fs_util::TEMP_PREFIX)),
        })
    }

    /// Resolves a stored name to its path, rejecting anything that is not a single visible
    /// file-name segment.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        fs_util::validate_file_name("stored_name", name)?;
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        let Ok(path) = self.path_of(name) else {
            return false;
        };
        fs::symlink_metadata(path).is_ok_and(|md| md.is_file())
    }

    /// Stored names in lexicographic order. A missing store directory lists as empty.
    pub fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::io(&self.root, source)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::io(&self.root, source))?;
            let is_file = entry.file_type().is_ok_and(|ty| ty.is_file());
            if !is_file {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot::from_names(self.list_all()?))
    }

    pub fn open(&self, name: &str) -> Result<fs::File, StoreError> {
        let path = self.path_of(name)?;
        fs_util::refuse_symlink(&path)?;
        fs::File::open(&path).map_err(|source| StoreError::io(&path, source))
    }
}

/// Upload in progress, created by [`FileStore::begin`].
#[derive(Debug)]
pub struct PendingUpload {
    store: FileStore,
    original_name: String,
    temp_path: PathBuf,
    file: Option<fs::File>,
    len: u64,
    committed: bool,
}

impl PendingUpload {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn write(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        let Some(file) = self.file.as_mut() else {
            return Err(StoreError::io(
                &self.temp_path,
                io::Error::other("upload already closed"),
            ));
        };
        file.write_all(chunk)
            .map_err(|source| StoreError::io(&self.temp_path, source))?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Publishes the upload under a fresh `<millis>-<sanitized name>`.
    ///
    /// The final name is claimed with a hard link, which fails instead of replacing an existing
    /// file, so a stored name is never reused.
    pub fn commit(mut self) -> Result<StoredFile, StoreError> {
        let durable = self.store.durability == WriteDurability::Durable;
        if let Some(file) = self.file.take() {
            if durable {
                file.sync_all()
                    .map_err(|source| StoreError::io(&self.temp_path, source))?;
            }
        }

        let sanitized = sanitize_original_name(&self.original_name);
        for _ in 0..MAX_PUT_ATTEMPTS {
            let disambiguator = self.store.next_disambiguator();
            let name = format!("{disambiguator}{DISAMBIGUATOR_SEPARATOR}{sanitized}");
            let path = self.store.root.join(&name);

            match fs::hard_link(&self.temp_path, &path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StoreError::io(&path, source)),
            }

            self.committed = true;
            let _ = fs::remove_file(&self.temp_path);
            if durable {
                fs_util::sync_dir(&self.store.root)?;
            }

            return Ok(StoredFile {
                name,
                original_name: std::mem::take(&mut self.original_name),
                disambiguator,
                len: self.len,
            });
        }

        Err(StoreError::AlreadyExists {
            path: self
                .store
                .root
                .join(format!("*{DISAMBIGUATOR_SEPARATOR}{sanitized}")),
        })
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        drop(self.file.take());
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
