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

//! Catalog Service
//!
//! Reads the externally maintained `meta/*` documents. None of them are
//! generated here; they are passed through as stored, with built-in defaults
//! standing in when a document is absent or unreadable.

use serde::Serialize;
use serde_json::{json, Value};

use crate::core::{DirectoryResult, Kind};
use crate::storage::BlobStoreClient;

pub const CATEGORIES_KEY: &str = "meta/categories.json";
pub const ABOUT_KEY: &str = "meta/about.json";
pub const ADS_KEY: &str = "meta/ads.json";

/// The categories document as stored. Only its `stores` and `services`
/// members are required; everything else, including key order, is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryMap(Value);

impl Default for CategoryMap {
    fn default() -> Self {
        Self(json!({"stores": {}, "services": {}}))
    }
}

impl CategoryMap {
    pub fn for_kind(&self, kind: Kind) -> &Value {
        &self.0[kind.as_str()]
    }

    /// The `kind` member exactly as stored
    pub fn into_kind(self, kind: Kind) -> Value {
        match self.0 {
            Value::Object(mut document) => document.remove(kind.as_str()).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Decode the categories document; it must carry both kinds to be used
pub fn parse_category_map(bytes: &[u8]) -> Option<CategoryMap> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    let object = value.as_object()?;
    if !object.contains_key("stores") || !object.contains_key("services") {
        return None;
    }
    Some(CategoryMap(value))
}

pub fn default_about() -> Value {
    json!({
        "title": "Local Stores & Services Directory",
        "description": "Find local stores and services organized by location and category",
        "features": [
            "Hierarchical organization (State > City > Mandal > Category > Type)",
            "Separate stores and services directories",
            "Advanced filtering and search"
        ],
        "contact": "contact@localdirectory.com",
        "version": "2.0.0",
        "structure": "hierarchical",
        "lastUpdated": chrono::Utc::now().to_rfc3339(),
    })
}

pub fn default_ads() -> Value {
    json!([
        {
            "id": 1,
            "title": "List Your Business",
            "content": "Get featured in our hierarchical directory",
            "link": "#",
            "type": "featured",
            "position": "sidebar"
        },
        {
            "id": 2,
            "title": "Premium Placement",
            "content": "Top position in search results",
            "link": "#",
            "type": "premium",
            "position": "sidebar"
        }
    ])
}

#[derive(Clone)]
pub struct CatalogService {
    client: BlobStoreClient,
}

impl CatalogService {
    pub fn new(client: BlobStoreClient) -> Self {
        Self { client }
    }

    pub async fn categories(&self) -> DirectoryResult<CategoryMap> {
        let Some(bytes) = self.client.get(CATEGORIES_KEY).await? else {
            tracing::debug!("{} not present, returning empty category map", CATEGORIES_KEY);
            return Ok(CategoryMap::default());
        };
        Ok(parse_category_map(&bytes).unwrap_or_else(|| {
            tracing::warn!(
                "⚠️ {} is missing 'stores' or 'services', returning empty category map",
                CATEGORIES_KEY
            );
            CategoryMap::default()
        }))
    }

    pub async fn categories_for(&self, kind: Kind) -> DirectoryResult<Value> {
        Ok(self.categories().await?.into_kind(kind))
    }

    pub async fn about(&self) -> DirectoryResult<Value> {
        self.document_or(ABOUT_KEY, default_about).await
    }

    pub async fn ads(&self) -> DirectoryResult<Value> {
        self.document_or(ADS_KEY, default_ads).await
    }

    async fn document_or(&self, key: &str, fallback: fn() -> Value) -> DirectoryResult<Value> {
        let Some(bytes) = self.client.get(key).await? else {
            return Ok(fallback());
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!("⚠️ {} is not valid JSON ({}), serving defaults", key, e);
                Ok(fallback())
            }
        }
    }
}
