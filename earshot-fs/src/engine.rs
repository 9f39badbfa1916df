//! Filesystem engine
//!
//! Single coordination point for every operation against one storage tree. All
//! operations except [`FileSystem::resolve`] and [`FileSystem::file`] take the
//! engine's gate, a FIFO async mutex, so mutations and queries are totally ordered
//! within one engine and a caller's operations on the same path run in the order
//! it issued them. Waiting on the gate suspends the task, it never blocks a thread.
//!
//! The engine does not retry; backend failures surface as [`FsError::Storage`].

use crate::backend::{LocalBackend, StorageBackend};
use crate::directory::{validate_name, BaseAnchor, Directory};
use crate::error::{FsError, Result};
use crate::handle::{File, Registry};
use earshot_common::config::StorageRoots;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Suffix appended to a duplicated directory's name
pub const COPY_SUFFIX: &str = " (copy)";

/// Virtual filesystem engine
///
/// Cheap to clone; clones share the same gate, backend and handle registry.
#[derive(Clone)]
pub struct FileSystem {
    inner: Arc<FsInner>,
}

struct FsInner {
    roots: StorageRoots,
    backend: Arc<dyn StorageBackend>,
    gate: Mutex<()>,
    registry: Registry,
}

impl FileSystem {
    /// Engine over the local disk
    pub fn new(roots: StorageRoots) -> Self {
        Self::with_backend(roots, Arc::new(LocalBackend::new()))
    }

    pub fn with_backend(roots: StorageRoots, backend: Arc<dyn StorageBackend>) -> Self {
        info!(
            documents = %roots.documents.display(),
            cache = %roots.cache.display(),
            "Filesystem engine created"
        );
        Self {
            inner: Arc::new(FsInner {
                roots,
                backend,
                gate: Mutex::new(()),
                registry: Registry::default(),
            }),
        }
    }

    pub fn roots(&self) -> &StorageRoots {
        &self.inner.roots
    }

    /// Number of file handles currently alive
    pub fn live_handles(&self) -> usize {
        self.inner.registry.len()
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    fn backend(&self) -> &dyn StorageBackend {
        self.inner.backend.as_ref()
    }

    // ------------------------------------------------------------------
    // Resolution and handles
    // ------------------------------------------------------------------

    /// Absolute location of `directory`
    pub fn resolve(&self, directory: &Directory) -> Result<PathBuf> {
        let (base, relative) = directory.relative_path()?;
        let root = match base {
            BaseAnchor::Documents => &self.inner.roots.documents,
            BaseAnchor::Cache => &self.inner.roots.cache,
            BaseAnchor::Root => &self.inner.roots.filesystem,
        };
        if root.as_os_str().is_empty() {
            return Err(FsError::BrokenAnchor {
                reason: format!("{:?} root is unavailable", base),
            });
        }
        Ok(root.join(relative))
    }

    /// Handle for `name` inside `directory`
    ///
    /// Returns the already-issued handle when one for the same resolved path is
    /// still alive.
    pub fn file(&self, directory: &Directory, name: &str) -> Result<File> {
        validate_name(name)?;
        let path = self.resolve(directory)?.join(name);
        Ok(self.inner.registry.lookup(self, directory, name, path))
    }

    // ------------------------------------------------------------------
    // Directories
    // ------------------------------------------------------------------

    /// Create `directory` and any missing ancestors; idempotent
    pub async fn create_directory(&self, directory: &Directory) -> Result<()> {
        let path = self.resolve(directory)?;
        let _gate = self.inner.gate.lock().await;
        self.backend()
            .create_dir_all(&path)
            .await
            .map_err(FsError::storage(&path))
    }

    pub async fn directory_exists(&self, directory: &Directory) -> bool {
        let Ok(path) = self.resolve(directory) else {
            return false;
        };
        let _gate = self.inner.gate.lock().await;
        matches!(self.backend().metadata(&path).await, Ok(m) if m.is_dir)
    }

    /// Remove `directory` and its contents; backend errors propagate
    pub async fn remove_directory(&self, directory: &Directory) -> Result<()> {
        let path = self.resolve(directory)?;
        let _gate = self.inner.gate.lock().await;
        self.backend()
            .remove_dir_all(&path)
            .await
            .map_err(FsError::storage(&path))?;
        debug!(path = %path.display(), "Removed directory");
        Ok(())
    }

    /// Files directly inside `directory`, sorted by name
    ///
    /// A directory that does not exist has no files.
    pub async fn list_files(&self, directory: &Directory) -> Result<Vec<File>> {
        let path = self.resolve(directory)?;
        let entries = {
            let _gate = self.inner.gate.lock().await;
            match self.backend().read_dir(&path).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(FsError::storage(&path)(e)),
            }
        };
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| {
                let file_path = path.join(&entry.name);
                self.inner
                    .registry
                    .lookup(self, directory, &entry.name, file_path)
            })
            .collect())
    }

    /// Directories directly inside `directory`, sorted by name
    pub async fn list_subdirectories(&self, directory: &Directory) -> Result<Vec<Directory>> {
        let path = self.resolve(directory)?;
        let _gate = self.inner.gate.lock().await;
        match self.backend().read_dir(&path).await {
            Ok(entries) => Ok(entries
                .into_iter()
                .filter(|entry| entry.is_dir)
                .map(|entry| directory.join(entry.name))
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(FsError::storage(&path)(e)),
        }
    }

    /// Rename `directory` in place; the old value becomes stale
    pub async fn rename_directory(&self, directory: &Directory, new_name: &str) -> Result<Directory> {
        validate_name(new_name)?;
        let parent = directory.parent().ok_or_else(|| {
            FsError::InvalidOperation("cannot rename a base anchor".to_string())
        })?;
        let renamed = parent.join(new_name);
        self.relocate(directory, renamed).await
    }

    /// Move `directory` under `into`, keeping its name
    pub async fn move_directory(&self, directory: &Directory, into: &Directory) -> Result<Directory> {
        let name = directory.name().ok_or_else(|| {
            FsError::InvalidOperation("cannot move a base anchor".to_string())
        })?;
        let from = self.resolve(directory)?;
        let into_path = self.resolve(into)?;
        if into_path.starts_with(&from) {
            return Err(FsError::InvalidOperation(format!(
                "cannot move {} into itself",
                from.display()
            )));
        }
        {
            let _gate = self.inner.gate.lock().await;
            self.backend()
                .create_dir_all(&into_path)
                .await
                .map_err(FsError::storage(&into_path))?;
        }
        self.relocate(directory, into.join(name)).await
    }

    /// Copy `directory` to a sibling named with [`COPY_SUFFIX`]
    pub async fn duplicate_directory(&self, directory: &Directory) -> Result<Directory> {
        let (name, parent) = directory.name().zip(directory.parent()).ok_or_else(|| {
            FsError::InvalidOperation("cannot duplicate a base anchor".to_string())
        })?;
        let copy = parent.join(format!("{}{}", name, COPY_SUFFIX));
        let from = self.resolve(directory)?;
        let to = self.resolve(&copy)?;

        let _gate = self.inner.gate.lock().await;
        self.backend()
            .copy_dir_all(&from, &to)
            .await
            .map_err(FsError::storage(&to))?;
        debug!(from = %from.display(), to = %to.display(), "Duplicated directory");
        Ok(copy)
    }

    /// Total size in bytes of all files beneath `directory`
    pub async fn directory_size(&self, directory: &Directory) -> Result<u64> {
        let root = self.resolve(directory)?;
        let _gate = self.inner.gate.lock().await;

        let mut total = 0u64;
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let entries = self
                .backend()
                .read_dir(&dir)
                .await
                .map_err(FsError::storage(&dir))?;
            for entry in entries {
                let path = dir.join(&entry.name);
                if entry.is_dir {
                    pending.push(path);
                } else {
                    total += self.backend().metadata(&path).await.map(|m| m.len).unwrap_or(0);
                }
            }
        }
        Ok(total)
    }

    async fn relocate(&self, directory: &Directory, target: Directory) -> Result<Directory> {
        let from = self.resolve(directory)?;
        let to = self.resolve(&target)?;

        let _gate = self.inner.gate.lock().await;
        if self.backend().metadata(&to).await.is_ok() {
            return Err(FsError::Storage {
                path: to,
                source: std::io::Error::new(ErrorKind::AlreadyExists, "target already exists"),
            });
        }
        self.backend()
            .rename(&from, &to)
            .await
            .map_err(FsError::storage(&from))?;
        debug!(from = %from.display(), to = %to.display(), "Relocated directory");
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Ensure the containing directory exists, then create an empty file
    ///
    /// An existing file keeps its content.
    pub async fn create_file(&self, file: &File) -> Result<()> {
        let _gate = self.inner.gate.lock().await;
        self.ensure_parent(file.path()).await?;
        self.backend()
            .touch(file.path())
            .await
            .map_err(FsError::storage(file.path()))
    }

    /// Never fails; resolution or backend errors read as "absent"
    pub async fn file_exists(&self, file: &File) -> bool {
        let _gate = self.inner.gate.lock().await;
        matches!(self.backend().metadata(file.path()).await, Ok(m) if !m.is_dir)
    }

    /// Content size in bytes, 0 when metadata is unavailable
    pub async fn file_size(&self, file: &File) -> u64 {
        let _gate = self.inner.gate.lock().await;
        self.backend()
            .metadata(file.path())
            .await
            .map(|m| m.len)
            .unwrap_or(0)
    }

    /// Remove `file` if it exists
    pub async fn remove_file(&self, file: &File) -> Result<()> {
        let _gate = self.inner.gate.lock().await;
        if self.backend().metadata(file.path()).await.is_err() {
            return Ok(());
        }
        self.backend()
            .remove_file(file.path())
            .await
            .map_err(FsError::storage(file.path()))
    }

    /// Replace the file's content with the JSON encoding of `value`
    pub async fn save_object<T: Serialize + ?Sized>(&self, value: &T, file: &File) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(FsError::Encode)?;
        self.save_bytes(&bytes, file).await
    }

    /// Replace the file's content
    ///
    /// An existing file is removed and recreated first, so no old content can
    /// survive a successful call. If the write fails the file may be left absent.
    pub async fn save_bytes(&self, bytes: &[u8], file: &File) -> Result<()> {
        let path = file.path();
        let _gate = self.inner.gate.lock().await;
        if self.backend().metadata(path).await.is_ok() {
            self.backend()
                .remove_file(path)
                .await
                .map_err(FsError::storage(path))?;
        }
        self.ensure_parent(path).await?;
        self.backend()
            .write(path, bytes)
            .await
            .map_err(FsError::storage(path))
    }

    /// Append the JSON encoding of `value` as a new line
    ///
    /// A fresh (absent or empty) file gets no leading separator, so the file
    /// always holds newline-delimited, independently decodable records.
    pub async fn append_object<T: Serialize + ?Sized>(&self, value: &T, file: &File) -> Result<()> {
        let encoded = serde_json::to_vec(value).map_err(FsError::Encode)?;
        let path = file.path();
        let _gate = self.inner.gate.lock().await;

        match self.backend().metadata(path).await {
            Ok(metadata) if metadata.len > 0 => {
                let mut line = Vec::with_capacity(encoded.len() + 1);
                line.push(b'\n');
                line.extend_from_slice(&encoded);
                self.backend()
                    .append(path, &line)
                    .await
                    .map_err(FsError::storage(path))
            }
            _ => {
                self.ensure_parent(path).await?;
                self.backend()
                    .write(path, &encoded)
                    .await
                    .map_err(FsError::storage(path))
            }
        }
    }

    /// Raw content, None when the file is absent
    pub async fn retrieve_bytes(&self, file: &File) -> Result<Option<Vec<u8>>> {
        let _gate = self.inner.gate.lock().await;
        self.read_locked(file.path()).await
    }

    /// Decode the file's single JSON value
    ///
    /// `Ok(None)` when the file is absent or empty, [`FsError::Decode`] when
    /// content is present but malformed.
    pub async fn retrieve_one<T: DeserializeOwned>(&self, file: &File) -> Result<Option<T>> {
        let content = {
            let _gate = self.inner.gate.lock().await;
            self.read_locked(file.path()).await?
        };
        match content {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| FsError::Decode {
                    path: file.path().to_path_buf(),
                    line: None,
                    source,
                }),
            _ => Ok(None),
        }
    }

    /// Decode every newline-delimited record in the file
    ///
    /// An absent file yields an empty list and blank lines are skipped. Any
    /// malformed line fails the whole call.
    pub async fn retrieve_all<T: DeserializeOwned>(&self, file: &File) -> Result<Vec<T>> {
        let content = {
            let _gate = self.inner.gate.lock().await;
            self.read_locked(file.path()).await?
        };
        let Some(bytes) = content else {
            return Ok(Vec::new());
        };

        bytes
            .split(|b| *b == b'\n')
            .enumerate()
            .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
            .map(|(index, line)| {
                serde_json::from_slice(line).map_err(|source| FsError::Decode {
                    path: file.path().to_path_buf(),
                    line: Some(index + 1),
                    source,
                })
            })
            .collect()
    }

    async fn read_locked(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match self.backend().read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsError::storage(path)(e)),
        }
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if let Err(e) = self.backend().create_dir_all(parent).await {
            warn!(path = %parent.display(), error = %e, "Failed to create containing directory");
            return Err(FsError::storage(parent)(e));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("roots", &self.inner.roots)
            .field("live_handles", &self.live_handles())
            .finish()
    }
}
