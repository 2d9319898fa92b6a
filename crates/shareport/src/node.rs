//! Capability interface for the backing store, plus the local-filesystem
//! implementation used by the standalone binary.
//!
//! The server core never touches storage directly: every routed operation
//! goes through [`Node`], so alternative stores (archives, remote mounts)
//! can be plugged in without touching the HTTP layer. Nodes are cheap
//! metadata snapshots re-derived on every request; there is no in-memory
//! tree cache, so external changes to the store are visible immediately.

use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission denied")]
    PermissionDenied,

    /// The store refused the operation without raising an I/O error,
    /// e.g. a name collision on create or rename.
    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StoreError::PermissionDenied,
            _ => StoreError::Io(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

pub type NodeReader = Box<dyn AsyncRead + Send + Unpin>;
pub type NodeWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One file or directory in the shared tree.
///
/// Metadata accessors are snapshots taken when the node was obtained.
/// All child lookups are by exact name; implementations must never match
/// a name containing a path separator (see [`valid_child_name`]).
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> NodeKind;
    /// Size in bytes; `None` for directories.
    fn size(&self) -> Option<u64>;
    /// Milliseconds since the Unix epoch, if the store tracks it.
    fn last_modified(&self) -> Option<u64>;
    /// Store-provided MIME type, if any. The HTTP layer falls back to
    /// extension-based guessing when this is `None`.
    fn content_type(&self) -> Option<String> {
        None
    }
    /// Opaque handle identifying this node within the backing store.
    /// Stable for a server session, not across remounts.
    fn identity(&self) -> String;
    fn clone_node(&self) -> Box<dyn Node>;

    async fn list_children(&self) -> Result<Vec<Box<dyn Node>>, StoreError>;
    async fn find_child(&self, name: &str) -> Result<Option<Box<dyn Node>>, StoreError>;
    async fn open_read(&self) -> Result<NodeReader, StoreError>;
    async fn open_write(&self) -> Result<NodeWriter, StoreError>;
    async fn create_file(
        &self,
        content_type: &str,
        name: &str,
    ) -> Result<Box<dyn Node>, StoreError>;
    async fn create_directory(&self, name: &str) -> Result<Box<dyn Node>, StoreError>;
    async fn delete(&self) -> Result<(), StoreError>;
    async fn rename(&self, new_name: &str) -> Result<(), StoreError>;
}

/// Child names must be single path segments: no separators, no `.`/`..`,
/// no NUL. Enforced at the store boundary in addition to handler-level
/// validation, so no store implementation can be walked out of its root.
pub fn valid_child_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Local-filesystem backing store.
#[derive(Debug, Clone)]
pub struct FsNode {
    path: PathBuf,
    name: String,
    kind: NodeKind,
    size: Option<u64>,
    modified: Option<u64>,
}

impl FsNode {
    /// Snapshot the node at `path`. Fails if the path does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let meta = fs::metadata(&path).await?;
        Ok(Self::from_metadata(path, &meta))
    }

    fn from_metadata(path: PathBuf, meta: &std::fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        let kind = if meta.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        let size = if meta.is_dir() { None } else { Some(meta.len()) };
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64);
        Self {
            path,
            name,
            kind,
            size,
            modified,
        }
    }

    fn child_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if !valid_child_name(name) {
            warn!("rejected child name at store boundary: {name:?}");
            return Err(StoreError::Failed(format!("invalid name: {name}")));
        }
        Ok(self.path.join(name))
    }
}

#[async_trait]
impl Node for FsNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn last_modified(&self) -> Option<u64> {
        self.modified
    }

    fn identity(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }

    async fn list_children(&self) -> Result<Vec<Box<dyn Node>>, StoreError> {
        let mut entries = fs::read_dir(&self.path).await?;
        let mut children: Vec<Box<dyn Node>> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Entry vanished between readdir and stat; skip it.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            children.push(Box::new(Self::from_metadata(entry.path(), &meta)));
        }
        Ok(children)
    }

    async fn find_child(&self, name: &str) -> Result<Option<Box<dyn Node>>, StoreError> {
        if !valid_child_name(name) {
            return Ok(None);
        }
        let child = self.path.join(name);
        match fs::metadata(&child).await {
            Ok(meta) => Ok(Some(Box::new(Self::from_metadata(child, &meta)))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn open_read(&self) -> Result<NodeReader, StoreError> {
        let file = fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }

    async fn open_write(&self) -> Result<NodeWriter, StoreError> {
        let file = fs::File::create(&self.path).await?;
        Ok(Box::new(file))
    }

    async fn create_file(
        &self,
        _content_type: &str,
        name: &str,
    ) -> Result<Box<dyn Node>, StoreError> {
        let child = self.child_path(name)?;
        if fs::metadata(&child).await.is_ok() {
            return Err(StoreError::Failed(format!(
                "a file or directory named {name:?} already exists"
            )));
        }
        drop(fs::File::create(&child).await?);
        let meta = fs::metadata(&child).await?;
        Ok(Box::new(Self::from_metadata(child, &meta)))
    }

    async fn create_directory(&self, name: &str) -> Result<Box<dyn Node>, StoreError> {
        let child = self.child_path(name)?;
        if fs::metadata(&child).await.is_ok() {
            return Err(StoreError::Failed(format!(
                "a file or directory named {name:?} already exists"
            )));
        }
        fs::create_dir(&child).await?;
        let meta = fs::metadata(&child).await?;
        Ok(Box::new(Self::from_metadata(child, &meta)))
    }

    async fn delete(&self) -> Result<(), StoreError> {
        match self.kind {
            NodeKind::Directory => fs::remove_dir_all(&self.path).await?,
            NodeKind::File => fs::remove_file(&self.path).await?,
        }
        Ok(())
    }

    async fn rename(&self, new_name: &str) -> Result<(), StoreError> {
        if !valid_child_name(new_name) {
            return Err(StoreError::Failed(format!("invalid name: {new_name}")));
        }
        let parent = self
            .path
            .parent()
            .ok_or_else(|| StoreError::Failed("node has no parent".to_string()))?;
        let target = parent.join(new_name);
        if fs::metadata(&target).await.is_ok() {
            return Err(StoreError::Failed(format!(
                "a file or directory named {new_name:?} already exists"
            )));
        }
        fs::rename(&self.path, &target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn root(tmp: &TempDir) -> FsNode {
        FsNode::open(tmp.path()).await.unwrap()
    }

    #[test]
    fn child_name_validation() {
        assert!(valid_child_name("notes.txt"));
        assert!(valid_child_name("with space"));
        assert!(!valid_child_name(""));
        assert!(!valid_child_name("."));
        assert!(!valid_child_name(".."));
        assert!(!valid_child_name("a/b"));
        assert!(!valid_child_name("a\\b"));
        assert!(!valid_child_name("a\0b"));
    }

    #[tokio::test]
    async fn metadata_snapshot() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("readme.txt"), "Hello, World!").unwrap();

        let root = root(&tmp).await;
        assert_eq!(root.kind(), NodeKind::Directory);
        assert_eq!(root.size(), None);

        let file = root.find_child("readme.txt").await.unwrap().unwrap();
        assert_eq!(file.kind(), NodeKind::File);
        assert_eq!(file.size(), Some(13));
        assert!(file.last_modified().is_some());
        assert_eq!(file.name(), "readme.txt");
    }

    #[tokio::test]
    async fn find_child_rejects_traversal_names() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("secret.txt"), "x").unwrap();

        let root = root(&tmp).await;
        let sub = root.find_child("sub").await.unwrap().unwrap();

        assert!(sub.find_child("..").await.unwrap().is_none());
        assert!(sub.find_child("../secret.txt").await.unwrap().is_none());
        assert!(sub.find_child("a\\b").await.unwrap().is_none());
        assert!(root.find_child("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_write_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let root = root(&tmp).await;

        let node = root.create_file("text/plain", "out.txt").await.unwrap();
        let mut writer = node.open_write().await.unwrap();
        writer.write_all(b"payload").await.unwrap();
        writer.shutdown().await.unwrap();

        let node = root.find_child("out.txt").await.unwrap().unwrap();
        let mut reader = node.open_read().await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "payload");
    }

    #[tokio::test]
    async fn create_collision_is_store_failure() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("taken.txt"), "x").unwrap();

        let root = root(&tmp).await;
        let result = root.create_file("text/plain", "taken.txt").await;
        assert!(matches!(result, Err(StoreError::Failed(_))));

        let result = root.create_directory("taken.txt").await;
        assert!(matches!(result, Err(StoreError::Failed(_))));
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("old.txt"), "x").unwrap();
        std::fs::write(tmp.path().join("blocker.txt"), "y").unwrap();

        let root = root(&tmp).await;
        let node = root.find_child("old.txt").await.unwrap().unwrap();

        let result = node.rename("blocker.txt").await;
        assert!(matches!(result, Err(StoreError::Failed(_))));

        node.rename("new.txt").await.unwrap();
        assert!(root.find_child("old.txt").await.unwrap().is_none());

        let renamed = root.find_child("new.txt").await.unwrap().unwrap();
        renamed.delete().await.unwrap();
        assert!(root.find_child("new.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_directory_recursively() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("dir/nested")).unwrap();
        std::fs::write(tmp.path().join("dir/nested/f.txt"), "x").unwrap();

        let root = root(&tmp).await;
        let dir = root.find_child("dir").await.unwrap().unwrap();
        dir.delete().await.unwrap();
        assert!(root.find_child("dir").await.unwrap().is_none());
    }
}
