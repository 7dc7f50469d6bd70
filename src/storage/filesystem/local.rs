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

//! Local directory blob store: every key is a file path relative to the root

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{
    check_precondition, content_etag, BlobStore, FilesystemError, FsResult, WritePrecondition,
};

/// Local filesystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory every key is resolved against
    pub root_dir: PathBuf,

    /// fsync object files before the rename that publishes them
    pub sync_enabled: bool,
}

impl LocalConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            sync_enabled: true,
        }
    }
}

/// Local filesystem implementation
#[derive(Debug)]
pub struct LocalFileSystem {
    config: LocalConfig,
    // Conditional writes compare and replace under this lock; only guards
    // writers inside this process.
    cas_lock: Mutex<()>,
}

impl LocalFileSystem {
    /// Create new local blob store, creating the root directory if needed
    pub async fn new(config: LocalConfig) -> FsResult<Self> {
        fs::create_dir_all(&config.root_dir).await?;
        let metadata = fs::metadata(&config.root_dir).await?;
        if !metadata.is_dir() {
            return Err(FilesystemError::Config(format!(
                "Root path is not a directory: {}",
                config.root_dir.display()
            )));
        }

        Ok(Self {
            config,
            cas_lock: Mutex::new(()),
        })
    }

    /// Resolve a key under the root, rejecting anything that would escape it
    fn resolve_path(&self, key: &str) -> FsResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(FilesystemError::PermissionDenied(format!(
                "key escapes store root: {}",
                key
            )));
        }
        Ok(self.config.root_dir.join(relative))
    }

    fn map_io_error(path: &Path, e: std::io::Error) -> FilesystemError {
        match e.kind() {
            std::io::ErrorKind::NotFound => FilesystemError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                FilesystemError::PermissionDenied(path.display().to_string())
            }
            _ => FilesystemError::Io(e),
        }
    }

    async fn read_path(&self, path: &Path) -> FsResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(path, e)),
        }
    }

    /// Write through a sibling temp file so readers never observe a partial object
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> FsResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        if self.config.sync_enabled {
            file.sync_all().await?;
        }
        drop(file);

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Self::map_io_error(path, e));
        }
        Ok(())
    }

    /// Keys under `dir`, relative to the root with `/` separators
    async fn walk(&self, dir: PathBuf, out: &mut Vec<String>) -> FsResult<()> {
        let mut pending = vec![dir];
        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::map_io_error(&current, e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if is_temp_file(&path) {
                        continue;
                    }
                    if let Ok(relative) = path.strip_prefix(&self.config.root_dir) {
                        let key = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/");
                        out.push(key);
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| {
            let n = n.to_string_lossy();
            n.starts_with('.') && n.ends_with(".tmp")
        })
        .unwrap_or(false)
}

#[async_trait]
impl BlobStore for LocalFileSystem {
    async fn read(&self, key: &str) -> FsResult<Vec<u8>> {
        let resolved_path = self.resolve_path(key)?;
        self.read_path(&resolved_path)
            .await?
            .ok_or_else(|| FilesystemError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, data: &[u8]) -> FsResult<()> {
        let resolved_path = self.resolve_path(key)?;
        self.write_atomic(&resolved_path, data).await
    }

    async fn write_conditional(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> FsResult<String> {
        let resolved_path = self.resolve_path(key)?;
        let _guard = self.cas_lock.lock().await;

        let current = self.read_path(&resolved_path).await?;
        let current_etag = current.as_deref().map(content_etag);
        check_precondition(key, current_etag.as_deref(), &precondition)?;

        self.write_atomic(&resolved_path, data).await?;
        Ok(content_etag(data))
    }

    async fn list(&self, prefix: &str) -> FsResult<Vec<String>> {
        // Walk from the deepest directory fully named by the prefix, then filter
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.config.root_dir.clone()
        } else {
            self.resolve_path(dir_part)?
        };

        let mut keys = Vec::new();
        self.walk(start, &mut keys).await?;
        keys.retain(|k| k.starts_with(prefix));
        Ok(keys)
    }

    fn store_type(&self) -> &'static str {
        "local"
    }
}
