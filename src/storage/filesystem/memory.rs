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

//! In-memory blob store

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{check_precondition, content_etag, BlobStore, FilesystemError, FsResult};
use super::WritePrecondition;

/// Ordered in-process object map
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `(key, contents)` pairs
    pub fn with_objects<I, K, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let store = Self::new();
        {
            let mut map = store.objects.write();
            for (key, value) in objects {
                map.insert(key.into(), value.into());
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, key: &str) -> FsResult<Vec<u8>> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| FilesystemError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, data: &[u8]) -> FsResult<()> {
        self.objects.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn write_conditional(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> FsResult<String> {
        let mut objects = self.objects.write();
        let current = objects.get(key).map(|existing| content_etag(existing));
        check_precondition(key, current.as_deref(), &precondition)?;
        objects.insert(key.to_string(), data.to_vec());
        Ok(content_etag(data))
    }

    async fn list(&self, prefix: &str) -> FsResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
