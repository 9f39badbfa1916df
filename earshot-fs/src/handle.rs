//! File handles and the handle registry
//!
//! The registry maps a resolved absolute path to a weak reference to the one live
//! [`File`] for that path. Lookups upgrade the weak entry when possible; the entry
//! is removed when the last clone of the handle is dropped.

use crate::directory::Directory;
use crate::engine::FileSystem;
use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::trace;

/// Handle to a file inside a [`FileSystem`]
///
/// Cloning is cheap and yields the same handle ([`File::ptr_eq`] holds). The file
/// need not exist on disk; use [`File::exists`] to check storage.
#[derive(Clone)]
pub struct File {
    inner: Arc<FileInner>,
}

pub(crate) struct FileInner {
    directory: Directory,
    name: String,
    path: PathBuf,
    fs: FileSystem,
}

impl Drop for FileInner {
    fn drop(&mut self) {
        self.fs.registry().release(&self.path, self as *const FileInner);
    }
}

impl File {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn directory(&self) -> &Directory {
        &self.inner.directory
    }

    /// Absolute location this handle was resolved to
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Whether two handles are the same registry object
    pub fn ptr_eq(a: &File, b: &File) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub async fn exists(&self) -> bool {
        self.inner.fs.file_exists(self).await
    }

    pub async fn size(&self) -> u64 {
        self.inner.fs.file_size(self).await
    }

    pub async fn create(&self) -> Result<()> {
        self.inner.fs.create_file(self).await
    }

    pub async fn remove(&self) -> Result<()> {
        self.inner.fs.remove_file(self).await
    }

    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.inner.fs.save_object(value, self).await
    }

    pub async fn save_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.inner.fs.save_bytes(bytes, self).await
    }

    pub async fn append<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.inner.fs.append_object(value, self).await
    }

    pub async fn retrieve_one<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.inner.fs.retrieve_one(self).await
    }

    pub async fn retrieve_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.inner.fs.retrieve_all(self).await
    }

    pub async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.inner.fs.retrieve_bytes(self).await
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("directory", &self.inner.directory)
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .finish()
    }
}

/// Path -> live handle table, private to one engine instance
#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<HashMap<PathBuf, Weak<FileInner>>>,
}

impl Registry {
    /// Return the live handle for `path`, creating one if none is alive
    pub(crate) fn lookup(
        &self,
        fs: &FileSystem,
        directory: &Directory,
        name: &str,
        path: PathBuf,
    ) -> File {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&path).and_then(Weak::upgrade) {
            return File { inner: existing };
        }

        let inner = Arc::new(FileInner {
            directory: directory.clone(),
            name: name.to_string(),
            path: path.clone(),
            fs: fs.clone(),
        });
        trace!(path = %path.display(), "Registered file handle");
        entries.insert(path, Arc::downgrade(&inner));
        File { inner }
    }

    /// Deregister `path` if its entry still points at `handle`
    ///
    /// A lookup that raced the final drop may already have replaced the entry
    /// with a fresh handle, which must survive.
    fn release(&self, path: &Path, handle: *const FileInner) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(path) {
            if std::ptr::eq(entry.as_ptr(), handle) {
                entries.remove(path);
                trace!(path = %path.display(), "Released file handle");
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Weak<FileInner>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
