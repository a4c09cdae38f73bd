use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A binary object as returned by the store: body plus the metadata the
/// file-serving route needs.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub etag: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object store unavailable: {0}")]
    Io(#[from] std::io::Error),
}

/// Object store seam. Injected into the app state so workflows can run
/// against the filesystem in production and an in-memory store in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, silently overwriting any existing object.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Fetch the object at `key`. A missing key is `None`, never an error.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Best-effort delete. Failures are logged and reported as `false`;
    /// deleting a key that was never stored counts as success.
    async fn delete(&self, key: &str) -> bool;
}

/// Build a fresh object key for an uploaded file: `images/<uuid>.<ext>`,
/// where `<ext>` is whatever follows the last `.` of the original name
/// (empty when there is none), stripped to ASCII alphanumerics so the file
/// name stays a single fetchable path segment. Uniqueness rides on the
/// UUID, no collision check is made.
pub fn generate_object_key(original_name: &str) -> String {
    let extension: String = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("images/{}.{}", Uuid::new_v4(), extension)
}

/// Map a file name to a content type by its lowercased extension.
pub fn resolve_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

fn etag_of(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Filesystem-backed store. Each object is a file under the root directory;
/// its content type lives in a `<file>.ct` sidecar.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root. Keys must stay inside the
    /// root: no leading `/`, no `..` segments.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.starts_with('/')
            || Path::new(key).components().any(|c| c.as_os_str() == "..")
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn sidecar(path: &Path) -> PathBuf {
        let mut s = path.as_os_str().to_os_string();
        s.push(".ct");
        PathBuf::from(s)
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        tokio::fs::write(Self::sidecar(&path), content_type).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.resolve(key)?;
        let body = match tokio::fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content_type = tokio::fs::read_to_string(Self::sidecar(&path))
            .await
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        let etag = etag_of(&body);
        Ok(Some(StoredObject { body, content_type, etag }))
    }

    async fn delete(&self, key: &str) -> bool {
        let path = match self.resolve(key) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("refusing to delete object: {e}");
                return false;
            }
        };
        tokio::fs::remove_file(Self::sidecar(&path)).await.ok();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!("failed to delete object {key}: {e}");
                false
            }
        }
    }
}

/// In-memory store used by tests (and handy for local experiments).
#[derive(Default)]
pub struct MemoryStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let etag = etag_of(&bytes);
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body: bytes,
                content_type: content_type.to_string(),
                etag,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.objects.get(key).map(|o| o.clone()))
    }

    async fn delete(&self, key: &str) -> bool {
        self.objects.remove(key);
        true
    }
}
