// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Zip download of a whole gallery.
//!
//! The archive is produced on a blocking worker and handed to the response body in chunks
//! through a bounded channel, so memory use stays at a few chunks regardless of gallery size.
//! If a file cannot be read mid-way the stream ends with an error instead of a central
//! directory, and the client sees a truncated download rather than a valid archive with
//! missing photos. A dropped receiver (client gone) stops the worker at its next write.

use std::collections::HashSet;
use std::io::{self, Seek, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ResolvedPhoto;
use crate::model::GalleryToken;
use crate::store::{FileStore, StoreError};

const CHUNK_BYTES: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 8;

pub type ArchiveStream = ReceiverStream<Result<Bytes, io::Error>>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to copy {entry:?} into archive: {source}")]
    Copy {
        entry: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub entry_name: String,
    pub stored_name: String,
}

#[derive(Debug, Clone)]
pub struct ArchivePlan {
    token: GalleryToken,
    entries: Vec<ArchiveEntry>,
    store: FileStore,
}

/// Turns display names into unique, path-free zip entry names.
pub fn archive_entry_names<'a, I>(display_names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for display in display_names {
        let mut base: String = display
            .chars()
            .map(|ch| if matches!(ch, '/' | '\\') || ch.is_control() { '_' } else { ch })
            .collect();
        if base.is_empty() || base == "." || base == ".." {
            base = "photo".to_owned();
        }

        let mut candidate = base.clone();
        let mut n = 2;
        while !seen.insert(candidate.clone()) {
            candidate = numbered(&base, n);
            n += 1;
        }
        out.push(candidate);
    }

    out
}

fn numbered(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({n}){}", &name[..dot], &name[dot..]),
        _ => format!("{name} ({n})"),
    }
}

impl ArchivePlan {
    pub fn new(token: GalleryToken, photos: &[ResolvedPhoto], store: FileStore) -> Self {
        let names = archive_entry_names(photos.iter().map(|p| p.display_name.as_str()));
        let entries = names
            .into_iter()
            .zip(photos)
            .map(|(entry_name, photo)| ArchiveEntry {
                entry_name,
                stored_name: photo.stored_name.clone(),
            })
            .collect();
        Self {
            token,
            entries,
            store,
        }
    }

    pub fn token(&self) -> &GalleryToken {
        &self.token
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn file_name(&self) -> String {
        format!("gallery_{}.zip", self.token)
    }

    /// Writes the complete archive to `out`. `out` only needs `Write`; nothing is seeked.
    pub fn write_to<W: Write>(&self, out: W) -> Result<(), ArchiveError> {
        let mut zip = ZipWriter::new_stream(out);
        self.write_entries(&mut zip, &mut 0)?;
        zip.finish()?;
        Ok(())
    }

    /// Adds every entry to `zip`, counting the stored files opened in `opened`.
    fn write_entries<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        opened: &mut usize,
    ) -> Result<(), ArchiveError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            let mut file = self.store.open(&entry.stored_name)?;
            *opened += 1;
            let len = file.metadata().map(|md| md.len()).unwrap_or(0);

            zip.start_file(
                entry.entry_name.as_str(),
                options.large_file(len >= u64::from(u32::MAX)),
            )?;
            io::copy(&mut file, zip).map_err(|source| ArchiveError::Copy {
                entry: entry.entry_name.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Starts writing the archive on a blocking worker and returns the byte stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn into_stream(self) -> ArchiveStream {
        self.spawn_stream().0
    }

    /// Like [`ArchivePlan::into_stream`], also handing back the worker. The worker resolves to
    /// the number of stored files it opened before finishing or giving up.
    pub fn spawn_stream(self) -> (ArchiveStream, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);

        let worker = tokio::task::spawn_blocking(move || {
            let aborted = Arc::new(AtomicBool::new(false));
            let mut zip = ZipWriter::new_stream(ChannelWriter::new(tx.clone(), aborted.clone()));
            let mut opened = 0;

            let result = match self.write_entries(&mut zip, &mut opened) {
                Ok(()) => zip.finish().map(drop).map_err(ArchiveError::from),
                Err(err) => {
                    // An unfinished writer finalizes on drop; the aborted sink swallows that tail.
                    aborted.store(true, Ordering::SeqCst);
                    drop(zip);
                    Err(err)
                }
            };

            match result {
                Ok(()) => {
                    info!(token = %self.token, entries = self.entries.len(), "gallery archive sent");
                }
                Err(_) if tx.is_closed() => {
                    info!(token = %self.token, opened, "client went away during archive download");
                }
                Err(err) => {
                    error!(token = %self.token, %err, "aborting gallery archive");
                    let _ = tx.blocking_send(Err(io::Error::other(err.to_string())));
                }
            }
            opened
        });

        (ReceiverStream::new(rx), worker)
    }
}

fn receiver_dropped() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped")
}

/// `Write` adapter that forwards fixed-size chunks into a bounded channel.
///
/// Buffered bytes are sent on flush and on drop. Once the archive is aborted every write is
/// accepted and discarded, so nothing after the failure reaches the client.
struct ChannelWriter {
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
    buf: Vec<u8>,
    aborted: Arc<AtomicBool>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Result<Bytes, io::Error>>, aborted: Arc<AtomicBool>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_BYTES),
            aborted,
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buf,
            Vec::with_capacity(CHUNK_BYTES),
        ));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| receiver_dropped())
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.aborted.load(Ordering::SeqCst) {
            return Ok(data.len());
        }
        if self.tx.is_closed() {
            return Err(receiver_dropped());
        }
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_BYTES {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.aborted.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.send_buffered()
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        if !self.aborted.load(Ordering::SeqCst) {
            let _ = self.send_buffered();
        }
    }
}
