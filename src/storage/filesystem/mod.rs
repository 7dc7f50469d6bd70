/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Blob Store Abstraction Layer
//!
//! Provides a key-prefix-addressable object store interface with pluggable backends:
//! - memory:// - In-process map (tests, ephemeral deployments)
//! - file://   - Local directory tree, one file per key
//!
//! Unqualified URLs are treated as local directories. Every call routed through
//! [`BlobStoreClient`] carries a bounded timeout; an elapsed call is reported as
//! [`FilesystemError::Timeout`] and never retried here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod local;
pub mod memory;

use local::{LocalConfig, LocalFileSystem};
use memory::MemoryBlobStore;

/// Blob store operation result type
pub type FsResult<T> = Result<T, FilesystemError>;

/// Blob store error types
#[derive(Debug, thiserror::Error)]
pub enum FilesystemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported blob store scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Precondition failed for {key}: {reason}")]
    PreconditionFailed { key: String, reason: String },

    #[error("{operation} on '{key}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        key: String,
        timeout_ms: u64,
    },
}

/// Object contents together with the version tag they were read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedObject {
    pub data: Vec<u8>,
    pub etag: String,
}

/// Condition a write must satisfy to be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritePrecondition {
    /// Replace only if the current version still carries this tag
    IfMatch(String),
    /// Create only if no object exists under the key
    IfNotExists,
}

/// Version tag for a blob: CRC32 of the contents plus length
pub fn content_etag(data: &[u8]) -> String {
    format!("{:08x}-{}", crc32fast::hash(data), data.len())
}

/// Abstract blob store trait for strategy pattern
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read object contents; `NotFound` when the key is absent
    async fn read(&self, key: &str) -> FsResult<Vec<u8>>;

    /// Read object contents along with their current version tag
    async fn read_versioned(&self, key: &str) -> FsResult<VersionedObject> {
        let data = self.read(key).await?;
        let etag = content_etag(&data);
        Ok(VersionedObject { data, etag })
    }

    /// Create or replace an object unconditionally
    async fn write(&self, key: &str, data: &[u8]) -> FsResult<()>;

    /// Create or replace an object only if `precondition` holds; returns the new tag
    async fn write_conditional(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> FsResult<String>;

    /// Every key starting with `prefix`, in no particular order
    async fn list(&self, prefix: &str) -> FsResult<Vec<String>>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> FsResult<bool> {
        match self.read(key).await {
            Ok(_) => Ok(true),
            Err(FilesystemError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get store type identifier
    fn store_type(&self) -> &'static str;
}

/// Checks `precondition` against the version currently stored under `key`
pub(crate) fn check_precondition(
    key: &str,
    current_etag: Option<&str>,
    precondition: &WritePrecondition,
) -> FsResult<()> {
    match (precondition, current_etag) {
        (WritePrecondition::IfNotExists, None) => Ok(()),
        (WritePrecondition::IfNotExists, Some(_)) => Err(FilesystemError::PreconditionFailed {
            key: key.to_string(),
            reason: "object already exists".to_string(),
        }),
        (WritePrecondition::IfMatch(expected), Some(current)) if expected == current => Ok(()),
        (WritePrecondition::IfMatch(expected), Some(current)) => {
            Err(FilesystemError::PreconditionFailed {
                key: key.to_string(),
                reason: format!("expected version {}, found {}", expected, current),
            })
        }
        (WritePrecondition::IfMatch(_), None) => Err(FilesystemError::PreconditionFailed {
            key: key.to_string(),
            reason: "object no longer exists".to_string(),
        }),
    }
}

/// Routing and timeout layer in front of a concrete [`BlobStore`]
#[derive(Clone)]
pub struct BlobStoreClient {
    backend: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl BlobStoreClient {
    pub fn new(backend: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Build the backend named by the URL scheme
    pub async fn from_url(url: &str, timeout: Duration) -> FsResult<Self> {
        let backend: Arc<dyn BlobStore> = match Self::extract_scheme(url)?.as_str() {
            "memory" => Arc::new(MemoryBlobStore::new()),
            "file" => {
                let root_dir = Self::extract_local_path(url)?;
                Arc::new(LocalFileSystem::new(LocalConfig::new(root_dir)).await?)
            }
            other => return Err(FilesystemError::UnsupportedScheme(other.to_string())),
        };
        tracing::info!(
            "🗄️ Blob store ready: {} ({}), timeout {}ms",
            backend.store_type(),
            url,
            timeout.as_millis()
        );
        Ok(Self::new(backend, timeout))
    }

    /// Extract scheme from URL; unqualified paths are local directories
    fn extract_scheme(url: &str) -> FsResult<String> {
        if url.contains("://") {
            let parsed = Url::parse(url)?;
            Ok(parsed.scheme().to_string())
        } else {
            Ok("file".to_string())
        }
    }

    fn extract_local_path(url: &str) -> FsResult<std::path::PathBuf> {
        // file://./data and file://data are relative to the working directory
        if let Some(rest) = url.strip_prefix("file://") {
            if !rest.starts_with('/') {
                return Ok(std::path::PathBuf::from(rest));
            }
        }
        if url.contains("://") {
            Url::parse(url)?
                .to_file_path()
                .map_err(|_| FilesystemError::Config(format!("Not a local file URL: {}", url)))
        } else {
            Ok(std::path::PathBuf::from(url))
        }
    }

    pub fn store_type(&self) -> &'static str {
        self.backend.store_type()
    }

    async fn timed<T, F>(&self, operation: &'static str, key: &str, fut: F) -> FsResult<T>
    where
        F: std::future::Future<Output = FsResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("⏱️ {} on '{}' exceeded {:?}", operation, key, self.timeout);
                Err(FilesystemError::Timeout {
                    operation,
                    key: key.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Object contents, or `None` when the key is absent
    pub async fn get(&self, key: &str) -> FsResult<Option<Vec<u8>>> {
        tracing::debug!("📖 {}::get - {}", self.store_type(), key);
        match self.timed("get", key, self.backend.read(key)).await {
            Ok(data) => {
                tracing::debug!("✅ Read {} bytes from {}", data.len(), key);
                Ok(Some(data))
            }
            Err(FilesystemError::NotFound(_)) => Ok(None),
            Err(e) => {
                tracing::error!("❌ Read failed for {}: {}", key, e);
                Err(e)
            }
        }
    }

    pub async fn get_versioned(&self, key: &str) -> FsResult<Option<VersionedObject>> {
        tracing::debug!("📖 {}::get_versioned - {}", self.store_type(), key);
        match self
            .timed("get", key, self.backend.read_versioned(key))
            .await
        {
            Ok(object) => Ok(Some(object)),
            Err(FilesystemError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> FsResult<()> {
        tracing::debug!("📝 {}::put - {} ({} bytes)", self.store_type(), key, data.len());
        let result = self.timed("put", key, self.backend.write(key, data)).await;
        if let Err(e) = &result {
            tracing::error!("❌ Write failed to {}: {}", key, e);
        }
        result
    }

    pub async fn put_conditional(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> FsResult<String> {
        tracing::debug!(
            "📝 {}::put_conditional - {} ({} bytes, {:?})",
            self.store_type(),
            key,
            data.len(),
            precondition
        );
        self.timed(
            "put",
            key,
            self.backend.write_conditional(key, data, precondition),
        )
        .await
    }

    /// Keys under `prefix`, lexicographically sorted
    pub async fn list(&self, prefix: &str) -> FsResult<Vec<String>> {
        let mut keys = self.timed("list", prefix, self.backend.list(prefix)).await?;
        keys.sort();
        tracing::debug!("📋 {}::list - {} -> {} keys", self.store_type(), prefix, keys.len());
        Ok(keys)
    }
}
