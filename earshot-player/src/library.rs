//! Saved stations, streams, episodes and podcasts
//!
//! Each entity is a single JSON file named by its sanitised id, inside a folder
//! tree under `Documents/library` that mirrors the user's folders.

use crate::error::{Error, Result};
use earshot_common::{MediaItem, Podcast};
use earshot_fs::{sanitize_name, Directory, File, FileSystem, FsError};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

const LIBRARY_DIR: &str = "library";
const ITEM_EXT: &str = ".json";
const PODCAST_EXT: &str = ".podcast";

/// Folder-structured store built on the filesystem engine
#[derive(Clone)]
pub struct Library {
    fs: FileSystem,
    root: Directory,
}

impl Library {
    pub fn new(fs: FileSystem) -> Self {
        Self {
            fs,
            root: Directory::documents(LIBRARY_DIR),
        }
    }

    /// Top-level library folder
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Folder at `path` relative to the library root
    pub fn folder(&self, path: impl AsRef<Path>) -> Directory {
        self.root.join(path)
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Save `item` into `folder`, replacing any previous version
    pub async fn save(&self, folder: &Directory, item: &MediaItem) -> Result<File> {
        let file = self.fs.file(folder, &item_file_name(&item.id))?;
        self.fs.save_object(item, &file).await?;
        debug!(item = %item.id, file = %file.path().display(), "Saved to library");
        Ok(file)
    }

    /// Remove the item with `id` from `folder`; absent items are ignored
    pub async fn remove(&self, folder: &Directory, id: &str) -> Result<()> {
        let file = self.fs.file(folder, &item_file_name(id))?;
        self.fs.remove_file(&file).await?;
        Ok(())
    }

    /// Items saved directly in `folder`, in file name order
    ///
    /// Unreadable files are skipped with a warning.
    pub async fn items(&self, folder: &Directory) -> Result<Vec<MediaItem>> {
        self.read_entities(folder, |name| name.ends_with(ITEM_EXT))
            .await
    }

    // ------------------------------------------------------------------
    // Podcasts
    // ------------------------------------------------------------------

    pub async fn save_podcast(&self, folder: &Directory, podcast: &Podcast) -> Result<File> {
        let name = format!("{}{}", sanitize_name(&podcast.id), PODCAST_EXT);
        let file = self.fs.file(folder, &name)?;
        self.fs.save_object(podcast, &file).await?;
        debug!(podcast = %podcast.id, episodes = podcast.episodes.len(), "Saved podcast");
        Ok(file)
    }

    pub async fn podcasts(&self, folder: &Directory) -> Result<Vec<Podcast>> {
        self.read_entities(folder, |name| name.ends_with(PODCAST_EXT))
            .await
    }

    // ------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------

    pub async fn folders(&self, folder: &Directory) -> Result<Vec<Directory>> {
        Ok(self.fs.list_subdirectories(folder).await?)
    }

    /// Create a subfolder; idempotent
    pub async fn create_folder(&self, parent: &Directory, name: &str) -> Result<Directory> {
        check_folder_name(name)?;
        let folder = parent.join(name);
        self.fs.create_directory(&folder).await?;
        Ok(folder)
    }

    pub async fn rename_folder(&self, folder: &Directory, new_name: &str) -> Result<Directory> {
        check_folder_name(new_name)?;
        Ok(self.fs.rename_directory(folder, new_name).await?)
    }

    pub async fn move_folder(&self, folder: &Directory, into: &Directory) -> Result<Directory> {
        Ok(self.fs.move_directory(folder, into).await?)
    }

    pub async fn duplicate_folder(&self, folder: &Directory) -> Result<Directory> {
        Ok(self.fs.duplicate_directory(folder).await?)
    }

    pub async fn remove_folder(&self, folder: &Directory) -> Result<()> {
        Ok(self.fs.remove_directory(folder).await?)
    }

    /// Bytes used by everything beneath `folder`
    pub async fn folder_size(&self, folder: &Directory) -> Result<u64> {
        Ok(self.fs.directory_size(folder).await?)
    }

    async fn read_entities<T, F>(&self, folder: &Directory, wanted: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> bool,
    {
        let mut entities = Vec::new();
        for file in self.fs.list_files(folder).await? {
            if !wanted(file.name()) {
                continue;
            }
            match self.fs.retrieve_one::<T>(&file).await {
                Ok(Some(entity)) => entities.push(entity),
                Ok(None) => {}
                Err(e @ FsError::Decode { .. }) => {
                    warn!("Skipping unreadable library entry: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entities)
    }
}

fn item_file_name(id: &str) -> String {
    format!("{}{}", sanitize_name(id), ITEM_EXT)
}

/// Folder names are shown to the user, so they are rejected rather than rewritten
fn check_folder_name(name: &str) -> Result<()> {
    if name.is_empty() || sanitize_name(name) != name {
        return Err(Error::BadRequest(format!("invalid folder name '{}'", name)));
    }
    Ok(())
}
