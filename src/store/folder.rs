// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! File-backed durable store.
//!
//! Every persisted key maps to one pretty-printed JSON file, named by percent-encoding the
//! key with the `encodeURIComponent` rules and appending `.json`. [`FolderTransport`] lets a
//! session use a folder as its durable tier: requests are applied in order on a background
//! worker and answered with host events over a channel.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::persist::{
    DecodedRequest, FileResponse, HostEvent, HostRequest, HostTransport, TransportError,
};

const FILE_SUFFIX: &str = ".json";
const TEMP_PREFIX: &str = ".erdsketch.tmp.";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{name:?} is not a persisted key file name")]
    InvalidFileName { name: String },
    #[error("refusing to write through symlink {path:?}")]
    SymlinkRefused { path: PathBuf },
    #[error("cannot start folder worker: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Writes a temp file and renames it into place, without fsync.
    #[default]
    BestEffort,

    /// Also flushes file contents and the rename to stable storage where the platform
    /// allows it.
    Durable,
}

/// Percent-encodes `key` the way `encodeURIComponent` does and appends `.json`.
pub fn key_to_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + FILE_SUFFIX.len());
    for byte in key.bytes() {
        if is_unreserved(byte) {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    name.push_str(FILE_SUFFIX);
    name
}

/// Inverse of [`key_to_file_name`].
pub fn file_name_to_key(name: &str) -> Result<String, FolderError> {
    let invalid = || FolderError::InvalidFileName {
        name: name.to_owned(),
    };
    let encoded = name.strip_suffix(FILE_SUFFIX).ok_or_else(invalid)?;

    let mut bytes = Vec::with_capacity(encoded.len());
    let mut rest = encoded.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        if byte == b'%' {
            let [hi, lo, tail @ ..] = tail else {
                return Err(invalid());
            };
            let decoded = hex_value(*hi)
                .zip(hex_value(*lo))
                .map(|(hi, lo)| (hi << 4) | lo)
                .ok_or_else(invalid)?;
            bytes.push(decoded);
            rest = tail;
        } else {
            bytes.push(byte);
            rest = tail;
        }
    }
    String::from_utf8(bytes).map_err(|_| invalid())
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte)
}

fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).and_then(|value| u8::try_from(value).ok())
}

/// A directory holding one JSON file per persisted key.
#[derive(Debug, Clone)]
pub struct PersistFolder {
    root: PathBuf,
    durability: WriteDurability,
}

impl PersistFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(key_to_file_name(key))
    }

    pub fn write(&self, key: &str, value: &Value) -> Result<(), FolderError> {
        let file_name = key_to_file_name(key);
        let path = self.root.join(&file_name);
        let contents = serde_json::to_vec_pretty(value).map_err(|source| FolderError::Json {
            path: path.clone(),
            source,
        })?;
        self.replace_file(&file_name, &contents)?;
        debug!(key, path = %path.display(), "wrote persisted key");
        Ok(())
    }

    /// Deleting a key that was never written succeeds.
    pub fn delete(&self, key: &str) -> Result<(), FolderError> {
        let path = self.path_for_key(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FolderError::Io { path, source }),
        }
    }

    /// Reads every `*.json` file directly under the root. Unreadable files are skipped.
    ///
    /// Subdirectories are not walked: encoded key names never contain a path separator, so
    /// every key this store writes lives at the top level.
    pub fn load_all(&self) -> Result<BTreeMap<String, Value>, FolderError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(FolderError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut data = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| FolderError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_ok_and(|ty| ty.is_file()) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) || !name.ends_with(FILE_SUFFIX) {
                continue;
            }
            match read_key_file(&path, name) {
                Ok((key, value)) => {
                    data.insert(key, value);
                }
                Err(err) => warn!(error = %err, "skipping persisted file"),
            }
        }
        Ok(data)
    }

    /// Applies one host request and produces the host's answer.
    pub fn handle(&self, request: &HostRequest) -> Option<HostEvent> {
        let response = match request.decode() {
            Ok(DecodedRequest::Write { key, value }) => respond(&key, self.write(&key, &value)),
            Ok(DecodedRequest::Delete { key }) => respond(&key, self.delete(&key)),
            Ok(DecodedRequest::Reload) => {
                return match self.load_all() {
                    Ok(persisted_data) => Some(HostEvent::ReloadPersistedData { persisted_data }),
                    Err(err) => {
                        warn!(error = %err, "cannot reload persisted data");
                        None
                    }
                };
            }
            Err(err) => {
                warn!(error = %err, "malformed host request");
                FileResponse::failure(None, err.to_string())
            }
        };
        match HostEvent::file_response(&response) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(error = %err, "cannot encode file response");
                None
            }
        }
    }
}

impl PersistFolder {
    /// Replaces `file_name` under the root by renaming a freshly written sibling temp file
    /// over it. Durable folders also sync the temp file and the root directory.
    fn replace_file(&self, file_name: &str, contents: &[u8]) -> Result<(), FolderError> {
        fs::create_dir_all(&self.root).map_err(io_at(&self.root))?;
        let target = self.root.join(file_name);
        if fs::symlink_metadata(&target).is_ok_and(|md| md.file_type().is_symlink()) {
            return Err(FolderError::SymlinkRefused { path: target });
        }

        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .root
            .join(format!("{TEMP_PREFIX}{}-{seq}.{file_name}", std::process::id()));
        let written = self
            .write_temp(&tmp, contents)
            .and_then(|()| fs::rename(&tmp, &target).map_err(io_at(&target)));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        if self.durability == WriteDurability::Durable {
            sync_dir(&self.root)?;
        }
        Ok(())
    }

    fn write_temp(&self, tmp: &Path, contents: &[u8]) -> Result<(), FolderError> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(tmp)
            .map_err(io_at(tmp))?;
        file.write_all(contents).map_err(io_at(tmp))?;
        if self.durability == WriteDurability::Durable {
            file.sync_all().map_err(io_at(tmp))?;
        }
        Ok(())
    }
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> FolderError + '_ {
    move |source| FolderError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), FolderError> {
    fs::File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(io_at(dir))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), FolderError> {
    Ok(())
}

fn respond(key: &str, result: Result<(), FolderError>) -> FileResponse {
    match result {
        Ok(()) => FileResponse::success(key),
        Err(err) => {
            error!(key, error = %err, "durable write failed");
            FileResponse::failure(Some(key.to_owned()), err.to_string())
        }
    }
}

fn read_key_file(path: &Path, name: &str) -> Result<(String, Value), FolderError> {
    let key = file_name_to_key(name)?;
    let raw = fs::read(path).map_err(|source| FolderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_slice(&raw).map_err(|source| FolderError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((key, value))
}

#[derive(Debug, Default)]
struct WorkerState {
    queue: VecDeque<HostRequest>,
    busy: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct WorkerInner {
    state: Mutex<WorkerState>,
    cv: Condvar,
}

impl WorkerInner {
    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, WorkerState>) -> MutexGuard<'a, WorkerState> {
        self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct WorkerHandle {
    inner: Arc<WorkerInner>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.inner.lock().shutdown = true;
        self.inner.cv.notify_all();
        let thread = self
            .thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("folder worker panicked");
            }
        }
    }
}

/// [`HostTransport`] backed by a [`PersistFolder`] on a background thread.
///
/// Clones share the worker. Dropping the last clone drains the queue and stops the worker.
#[derive(Debug, Clone)]
pub struct FolderTransport {
    handle: Arc<WorkerHandle>,
}

impl FolderTransport {
    /// Starts the worker. Answers are sent to `events`.
    pub fn spawn(folder: PersistFolder, events: Sender<HostEvent>) -> Result<Self, FolderError> {
        let inner = Arc::new(WorkerInner::default());
        let thread = std::thread::Builder::new()
            .name("erdsketch-folder-store".to_owned())
            .spawn({
                let inner = inner.clone();
                move || run_worker(&inner, &folder, &events)
            })
            .map_err(FolderError::Spawn)?;
        Ok(Self {
            handle: Arc::new(WorkerHandle {
                inner,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Blocks until every request posted so far has been applied.
    pub fn flush(&self) {
        let inner = &self.handle.inner;
        let mut state = inner.lock();
        while state.busy || !state.queue.is_empty() {
            state = inner.wait(state);
        }
    }

    pub fn queued(&self) -> usize {
        self.handle.inner.lock().queue.len()
    }
}

impl HostTransport for FolderTransport {
    fn post(&self, request: &HostRequest) -> Result<(), TransportError> {
        let inner = &self.handle.inner;
        let mut state = inner.lock();
        if state.shutdown {
            return Err(TransportError::Closed);
        }
        state.queue.push_back(request.clone());
        inner.cv.notify_all();
        Ok(())
    }
}

fn run_worker(inner: &WorkerInner, folder: &PersistFolder, events: &Sender<HostEvent>) {
    loop {
        let request = {
            let mut state = inner.lock();
            loop {
                if let Some(request) = state.queue.pop_front() {
                    state.busy = true;
                    break Some(request);
                }
                if state.shutdown {
                    break None;
                }
                state = inner.wait(state);
            }
        };
        let Some(request) = request else {
            inner.cv.notify_all();
            return;
        };

        if let Some(event) = folder.handle(&request) {
            if events.send(event).is_err() {
                debug!("host event receiver dropped");
            }
        }

        inner.lock().busy = false;
        inner.cv.notify_all();
    }
}
