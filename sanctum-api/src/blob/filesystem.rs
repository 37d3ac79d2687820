//! Local filesystem blob backend
//!
//! Objects are written under a root directory and served back by the API at
//! `public_base_url`. Writes go to a temp file next to the target and are
//! renamed into place, so readers never see a half-written object.

use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{key_from_url, BlobError, BlobResult, BlobStore, StoredBlob};

#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemBlobStore {
    /// Create the store, making sure `root` exists
    pub async fn new(root: impl Into<PathBuf>, public_base_url: &str) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root, rejecting anything but plain components
    fn key_path(&self, key: &str) -> BlobResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(BlobError::InvalidKey(key.to_string()));
        }

        for component in Path::new(key).components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(BlobError::InvalidKey(format!(
                        "contains unsafe path component: {}",
                        key
                    )))
                }
            }
        }

        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> BlobResult<StoredBlob> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );

        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(key, size = bytes.len(), "Stored blob on filesystem");

        Ok(StoredBlob {
            url: format!("{}/{}", self.public_base_url, key),
            key: key.to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn delete(&self, url: &str) -> BlobResult<()> {
        let key = key_from_url(&self.public_base_url, url)?;
        let path = self.key_path(key)?;

        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(key.to_string())
            } else {
                BlobError::Io(e)
            }
        })
    }

    fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        key_from_url(&self.public_base_url, url).ok()
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
