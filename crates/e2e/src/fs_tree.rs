//! In-memory directory trees and their materialization on disk

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{E2eError, E2eResult};

/// A node of a [`DirectoryTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEntry {
    /// File with text content
    File(String),
    /// Nested directory
    Dir(DirectoryTree),
}

/// Mapping from path segment to file content or nested directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryTree {
    entries: BTreeMap<String, DirEntry>,
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any existing entry with the same name
    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, DirEntry::File(content.into()));
        self
    }

    /// Add a nested directory, replacing any existing entry with the same name
    pub fn dir(mut self, name: impl Into<String>, tree: DirectoryTree) -> Self {
        self.insert(name, DirEntry::Dir(tree));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: DirEntry) -> Option<DirEntry> {
        self.entries.insert(name.into(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&DirEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DirEntry> {
        self.entries.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DirEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Content of the file at a `/`-separated relative path
    pub fn file_content(&self, path: &str) -> Option<&str> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        let mut current = self;
        while let Some(segment) = segments.next() {
            match (current.entries.get(segment)?, segments.peek()) {
                (DirEntry::File(content), None) => return Some(content),
                (DirEntry::Dir(tree), Some(_)) => current = tree,
                _ => return None,
            }
        }
        None
    }

    /// Read a directory on disk back into a tree.
    ///
    /// Files must be valid UTF-8.
    pub fn from_dir(root: &Path) -> E2eResult<Self> {
        let mut tree = DirectoryTree::new();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            let Some((name, parents)) = segments.split_last() else {
                continue;
            };

            let parent = tree.ensure_dir(parents);
            if entry.file_type().is_dir() {
                parent.ensure_dir(std::slice::from_ref(name));
            } else {
                let content = std::fs::read_to_string(entry.path())?;
                parent.insert(name.clone(), DirEntry::File(content));
            }
        }

        Ok(tree)
    }

    fn ensure_dir(&mut self, segments: &[String]) -> &mut DirectoryTree {
        let mut current = self;
        for segment in segments {
            let entry = current
                .entries
                .entry(segment.clone())
                .or_insert_with(|| DirEntry::Dir(DirectoryTree::new()));
            if let DirEntry::File(_) = entry {
                *entry = DirEntry::Dir(DirectoryTree::new());
            }
            current = match entry {
                DirEntry::Dir(tree) => tree,
                DirEntry::File(_) => unreachable!("entry was replaced by a directory"),
            };
        }
        current
    }
}

impl<K: Into<String>> FromIterator<(K, DirEntry)> for DirectoryTree {
    fn from_iter<I: IntoIterator<Item = (K, DirEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Entry names must be a single normal path segment
fn check_entry_name(name: &str) -> E2eResult<()> {
    let invalid = |reason| E2eError::InvalidEntryName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("contains a path separator"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("not a plain file or directory name")),
    }
}

/// Write `tree` below `root`.
///
/// Files are overwritten, directories are created with their parents. The
/// first error aborts; whatever was written so far stays on disk. Entry
/// names that would escape `root` or span several segments are rejected.
pub fn materialize(root: &Path, tree: &DirectoryTree) -> E2eResult<()> {
    for (name, entry) in tree.iter() {
        check_entry_name(name)?;
        let path = root.join(name);
        match entry {
            DirEntry::File(content) => {
                std::fs::write(&path, content)?;
            }
            DirEntry::Dir(subtree) => {
                std::fs::create_dir_all(&path)?;
                materialize(&path, subtree)?;
            }
        }
    }
    Ok(())
}

/// Create a fresh, uniquely named directory below the system temp dir.
///
/// The directory is not removed automatically.
pub fn create_temp_dir() -> E2eResult<PathBuf> {
    let dir = std::env::temp_dir().join(uuid::Uuid::new_v4().to_string());
    std::fs::create_dir_all(&dir)?;
    debug!("Created temp dir {}", dir.display());
    Ok(dir)
}

/// Materialize `tree` into a fresh temp dir
pub fn build_temp_dir(tree: &DirectoryTree) -> E2eResult<PathBuf> {
    let dir = create_temp_dir()?;
    materialize(&dir, tree)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DirectoryTree {
        DirectoryTree::new()
            .file("app.yaml", "kind: wasmer.io/App.v0\n")
            .dir(
                "public",
                DirectoryTree::new()
                    .file("index.html", "<html><body>Hello!</body></html>")
                    .dir("assets", DirectoryTree::new().file("style.css", "body {}")),
            )
            .dir("empty", DirectoryTree::new())
    }

    #[test]
    fn test_file_content_lookup() {
        let tree = sample_tree();
        assert_eq!(
            tree.file_content("public/assets/style.css"),
            Some("body {}")
        );
        assert_eq!(tree.file_content("public"), None);
        assert_eq!(tree.file_content("missing.txt"), None);
        assert_eq!(tree.file_content("app.yaml/nested"), None);
    }

    #[test]
    fn test_materialize_overwrites_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.yaml"), "old").unwrap();

        materialize(dir.path(), &sample_tree()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("app.yaml")).unwrap();
        assert_eq!(content, "kind: wasmer.io/App.v0\n");
        assert!(dir.path().join("empty").is_dir());
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        materialize(dir.path(), &sample_tree()).unwrap();
        materialize(dir.path(), &sample_tree()).unwrap();

        assert_eq!(DirectoryTree::from_dir(dir.path()).unwrap(), sample_tree());
    }

    #[test]
    fn test_materialize_fails_when_file_blocks_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("public"), "not a dir").unwrap();

        assert!(materialize(dir.path(), &sample_tree()).is_err());
    }

    #[test]
    fn test_materialize_rejects_escaping_names() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().join("root");
        std::fs::create_dir(&root_path).unwrap();

        for name in ["/abs", "../x", "..", ".", "a/b", "a\\b", ""] {
            let tree = DirectoryTree::new().file(name, "escaped");
            let err = materialize(&root_path, &tree).unwrap_err();
            assert!(
                matches!(err, E2eError::InvalidEntryName { .. }),
                "{name:?}: {err:?}"
            );
        }

        let nested = DirectoryTree::new().dir("ok", DirectoryTree::new().file("../../x", "escaped"));
        assert!(materialize(&root_path, &nested).is_err());

        assert!(!root.path().join("x").exists());
        assert_eq!(std::fs::read_dir(&root_path).unwrap().count(), 1);
    }

    #[test]
    fn test_build_temp_dir_is_fresh() {
        let a = build_temp_dir(&sample_tree()).unwrap();
        let b = build_temp_dir(&sample_tree()).unwrap();
        assert_ne!(a, b);
        assert!(a.join("public/index.html").is_file());

        std::fs::remove_dir_all(a).unwrap();
        std::fs::remove_dir_all(b).unwrap();
    }
}
