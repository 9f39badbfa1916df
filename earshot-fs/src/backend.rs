//! Storage backends
//!
//! The engine talks to storage only through [`StorageBackend`]. Paths handed to a
//! backend are already resolved and absolute; backends do no locking of their own.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Backend-reported metadata for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub is_dir: bool,
    pub len: u64,
}

/// Immediate child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Real storage underneath a [`FileSystem`](crate::FileSystem)
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Create a directory and all missing ancestors
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create an empty file, or refresh the modification time of an existing one
    async fn touch(&self, path: &Path) -> io::Result<()>;

    /// Replace the file's content
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Append to an existing file
    async fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory and everything beneath it
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy a directory tree; fails if `to` already exists
    async fn copy_dir_all(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn metadata(&self, path: &Path) -> io::Result<EntryMetadata>;

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// Local disk backend using `tokio::fs`
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn touch(&self, path: &Path) -> io::Result<()> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .await?;
        let file = file.into_std().await;
        tokio::task::spawn_blocking(move || file.set_modified(SystemTime::now()))
            .await
            .map_err(io::Error::other)?
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await
    }

    async fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::OpenOptions::new().append(true).open(path).await?;
        file.write_all(bytes).await?;
        file.flush().await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn copy_dir_all(&self, from: &Path, to: &Path) -> io::Result<()> {
        // create_dir (not _all) so an existing target is an error
        fs::create_dir(to).await?;

        let mut pending: Vec<(PathBuf, PathBuf)> = vec![(from.to_path_buf(), to.to_path_buf())];
        while let Some((src, dst)) = pending.pop() {
            let mut entries = fs::read_dir(&src).await?;
            while let Some(entry) = entries.next_entry().await? {
                let target = dst.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    fs::create_dir(&target).await?;
                    pending.push((entry.path(), target));
                } else {
                    fs::copy(entry.path(), &target).await?;
                }
            }
        }
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        let metadata = fs::metadata(path).await?;
        Ok(EntryMetadata {
            is_dir: metadata.is_dir(),
            len: metadata.len(),
        })
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = fs::read_dir(path).await?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            match entry.file_name().into_string() {
                Ok(name) => out.push(DirEntry { name, is_dir }),
                Err(name) => warn!("Skipping non UTF-8 entry {:?} in {}", name, path.display()),
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
