//! Directory values and anchors
//!
//! A [`Directory`] is a plain value: an [`Anchor`] plus a relative path. Building
//! one never touches storage. Nested anchors are owned boxes, so an anchor chain
//! is acyclic by construction; broken chains (an absolute or `..` component, an
//! unavailable root) are reported when the engine resolves the directory.

use crate::error::{FsError, Result};
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// Root that a flattened directory is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseAnchor {
    /// Persisted user data
    Documents,
    /// Disposable data
    Cache,
    /// The filesystem root configured for the engine
    Root,
}

/// Reference point a directory's relative path starts from
#[derive(Debug, Clone)]
pub enum Anchor {
    Documents,
    Cache,
    Root,
    /// Another directory (nested)
    Directory(Box<Directory>),
}

/// Logical directory handle
///
/// Two directories are equal iff they flatten to the same base anchor and
/// relative path, however the anchor chain was built.
#[derive(Debug, Clone)]
pub struct Directory {
    anchor: Anchor,
    path: PathBuf,
}

impl Directory {
    pub fn new(anchor: Anchor, path: impl Into<PathBuf>) -> Self {
        Self {
            anchor,
            path: path.into(),
        }
    }

    pub fn documents(path: impl Into<PathBuf>) -> Self {
        Self::new(Anchor::Documents, path)
    }

    pub fn cache(path: impl Into<PathBuf>) -> Self {
        Self::new(Anchor::Cache, path)
    }

    pub fn root(path: impl Into<PathBuf>) -> Self {
        Self::new(Anchor::Root, path)
    }

    /// Directory anchored on `parent`
    pub fn nested(parent: &Directory, path: impl Into<PathBuf>) -> Self {
        Self::new(Anchor::Directory(Box::new(parent.clone())), path)
    }

    /// Child directory, flattened onto the same base anchor
    pub fn join(&self, name: impl AsRef<Path>) -> Self {
        let (base, path) = self.flatten();
        Self::from_base(base, path.join(name))
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Base anchor and relative path after walking the anchor chain
    pub fn flatten(&self) -> (BaseAnchor, PathBuf) {
        let mut segments = vec![self.path.as_path()];
        let mut current = &self.anchor;
        let base = loop {
            match current {
                Anchor::Documents => break BaseAnchor::Documents,
                Anchor::Cache => break BaseAnchor::Cache,
                Anchor::Root => break BaseAnchor::Root,
                Anchor::Directory(parent) => {
                    segments.push(parent.path.as_path());
                    current = &parent.anchor;
                }
            }
        };

        let mut path = PathBuf::new();
        for segment in segments.into_iter().rev() {
            for component in segment.components() {
                if component != Component::CurDir {
                    path.push(component);
                }
            }
        }
        (base, path)
    }

    /// Flattened relative path, rejecting components that would leave the anchor
    pub fn relative_path(&self) -> Result<(BaseAnchor, PathBuf)> {
        let (base, path) = self.flatten();
        for component in path.components() {
            match component {
                Component::Normal(segment) => {
                    if segment.to_str().is_none() {
                        return Err(FsError::BrokenAnchor {
                            reason: format!("path {:?} is not valid UTF-8", path),
                        });
                    }
                }
                other => {
                    return Err(FsError::BrokenAnchor {
                        reason: format!("path {:?} contains {:?}", path, other),
                    });
                }
            }
        }
        Ok((base, path))
    }

    /// Leaf name; None for a base anchor itself
    pub fn name(&self) -> Option<String> {
        let (_, path) = self.flatten();
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    /// Containing directory; None for a base anchor itself
    pub fn parent(&self) -> Option<Directory> {
        let (base, path) = self.flatten();
        path.file_name()?;
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(Self::from_base(base, parent))
    }

    fn from_base(base: BaseAnchor, path: PathBuf) -> Self {
        let anchor = match base {
            BaseAnchor::Documents => Anchor::Documents,
            BaseAnchor::Cache => Anchor::Cache,
            BaseAnchor::Root => Anchor::Root,
        };
        Self { anchor, path }
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.flatten() == other.flatten()
    }
}

impl Eq for Directory {}

impl Hash for Directory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flatten().hash(state);
    }
}

/// Check that `name` is a single, ordinary path component
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "empty"
    } else if name == "." || name == ".." {
        "refers to a relative directory"
    } else if name.contains('/') || name.contains('\\') {
        "contains a path separator"
    } else if name.contains('\0') {
        "contains NUL"
    } else {
        return Ok(());
    };
    Err(FsError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Map an arbitrary id to a safe single path component
///
/// Separators, NUL, control characters and `:` become `_`; a leading dot is
/// replaced so the result is never hidden or relative.
pub fn sanitize_name(id: &str) -> String {
    let mut out: String = id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if out.starts_with('.') {
        out.replace_range(0..1, "_");
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_flattened_path() {
        let streams = Directory::documents("streams");
        let nested = Directory::nested(&streams, "abc");
        let joined = streams.join("abc");
        let direct = Directory::documents("streams/abc");

        assert_eq!(nested, joined);
        assert_eq!(nested, direct);
        assert_ne!(direct, Directory::cache("streams/abc"));
        assert_ne!(direct, Directory::documents("streams"));
    }

    #[test]
    fn test_flatten_skips_cur_dir() {
        let dir = Directory::nested(&Directory::documents("./a"), "b/./c");
        assert_eq!(dir.flatten(), (BaseAnchor::Documents, PathBuf::from("a/b/c")));
    }

    #[test]
    fn test_relative_path_rejects_parent_components() {
        let dir = Directory::nested(&Directory::documents("a"), "../../etc");
        assert!(matches!(dir.relative_path(), Err(FsError::BrokenAnchor { .. })));

        let absolute = Directory::documents("/etc");
        assert!(matches!(absolute.relative_path(), Err(FsError::BrokenAnchor { .. })));
    }

    #[test]
    fn test_name_and_parent() {
        let dir = Directory::documents("library/rock/classics");
        assert_eq!(dir.name().as_deref(), Some("classics"));
        assert_eq!(dir.parent(), Some(Directory::documents("library/rock")));

        let base = Directory::documents("");
        assert_eq!(base.name(), None);
        assert_eq!(base.parent(), None);
        assert_eq!(Directory::documents("top").parent(), Some(base));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("abc.json").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("abc"), "abc");
        assert_eq!(sanitize_name("https://x/y"), "https___x_y");
        assert_eq!(sanitize_name(".hidden"), "_hidden");
        assert_eq!(sanitize_name(""), "_");
        assert!(validate_name(&sanitize_name("../../etc/passwd")).is_ok());
    }
}
