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

//! Record aggregation across partition files
//!
//! A complete five-level filter addresses exactly one partition object. Anything
//! narrower is resolved with a prefix listing; every `{kind}.json` under the
//! prefix is fetched concurrently and the arrays are concatenated in key order.
//!
//! A missing or malformed partition contributes nothing. Only store faults
//! (unreachable backend, timeout) fail an aggregation.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::filesystem::BlobStoreClient;
use super::partition::{build_key, is_partition_object, kind_prefix, PartitionKey};
use crate::core::{DirectoryResult, Kind, Listing, LocationFilter};
use crate::monitoring::metrics::{MALFORMED_PARTITIONS, PARTITION_FILES_FETCHED};

#[derive(Clone)]
pub struct PartitionAggregator {
    client: BlobStoreClient,
    max_concurrent_fetches: usize,
}

impl PartitionAggregator {
    pub fn new(client: BlobStoreClient, max_concurrent_fetches: usize) -> Self {
        Self {
            client,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    pub fn client(&self) -> &BlobStoreClient {
        &self.client
    }

    /// Every listing of `kind` inside the scope of `filter`
    pub async fn aggregate(&self, kind: Kind, filter: &LocationFilter) -> DirectoryResult<Vec<Listing>> {
        self.aggregate_levels(kind, &filter.levels()).await
    }

    /// Every listing of `kind` under the contiguous `levels` prefix (empty = whole kind)
    pub async fn aggregate_levels(&self, kind: Kind, levels: &[&str]) -> DirectoryResult<Vec<Listing>> {
        let started = Instant::now();

        let listings = if levels.is_empty() {
            self.aggregate_prefix(kind, &kind_prefix(kind)).await?
        } else {
            match build_key(kind, levels)? {
                PartitionKey::Exact(key) => self.fetch_partition(kind, key).await?,
                PartitionKey::Prefix(prefix) => self.aggregate_prefix(kind, &prefix).await?,
            }
        };

        info!(
            "📦 Aggregated {} {} across {} level(s) in {:?}",
            listings.len(),
            kind,
            levels.len(),
            started.elapsed()
        );
        Ok(listings)
    }

    async fn aggregate_prefix(&self, kind: Kind, prefix: &str) -> DirectoryResult<Vec<Listing>> {
        let keys: Vec<String> = self
            .client
            .list(prefix)
            .await?
            .into_iter()
            .filter(|key| is_partition_object(kind, key))
            .collect();

        debug!("🔍 {} partition objects under {}", keys.len(), prefix);

        // `buffered` keeps results in key order regardless of completion order
        let partitions: Vec<Vec<Listing>> = stream::iter(keys)
            .map(|key| self.fetch_partition(kind, key))
            .buffered(self.max_concurrent_fetches)
            .try_collect()
            .await?;

        Ok(partitions.into_iter().flatten().collect())
    }

    async fn fetch_partition(&self, kind: Kind, key: String) -> DirectoryResult<Vec<Listing>> {
        let Some(bytes) = self.client.get(&key).await? else {
            debug!("Partition {} does not exist", key);
            return Ok(Vec::new());
        };
        PARTITION_FILES_FETCHED.with_label_values(&[kind.as_str()]).inc();
        Ok(parse_partition(kind, &key, &bytes))
    }
}

/// Decode a partition object; anything other than a JSON array yields no listings
pub fn parse_partition(kind: Kind, key: &str, bytes: &[u8]) -> Vec<Listing> {
    let elements = match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Array(elements)) => elements,
        Ok(_) => {
            warn!("⚠️ Partition {} is not a JSON array, treating as empty", key);
            MALFORMED_PARTITIONS.with_label_values(&[kind.as_str()]).inc();
            return Vec::new();
        }
        Err(e) => {
            warn!("⚠️ Partition {} is not valid JSON ({}), treating as empty", key, e);
            MALFORMED_PARTITIONS.with_label_values(&[kind.as_str()]).inc();
            return Vec::new();
        }
    };

    elements
        .into_iter()
        .enumerate()
        .filter_map(|(idx, element)| {
            if !element.is_object() {
                warn!("Skipping non-object element {} in {}", idx, key);
                return None;
            }
            match serde_json::from_value::<Listing>(element) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!("Skipping undecodable element {} in {}: {}", idx, key, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::filesystem::memory::MemoryBlobStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn aggregator(objects: Vec<(&str, String)>) -> PartitionAggregator {
        let store = MemoryBlobStore::with_objects(objects);
        let client = BlobStoreClient::new(Arc::new(store), Duration::from_secs(5));
        PartitionAggregator::new(client, 4)
    }

    fn partition(names: &[&str]) -> String {
        let items: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
        serde_json::to_string(&items).unwrap()
    }

    fn names(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_exact_partition() {
        let agg = aggregator(vec![(
            "stores/T/H/K/G/Kirana/stores.json",
            partition(&["a", "b"]),
        )]);
        let filter = LocationFilter::new()
            .state("T")
            .city("H")
            .mandal("K")
            .category("G")
            .service_type("Kirana");
        let listings = agg.aggregate(Kind::Stores, &filter).await.unwrap();
        assert_eq!(names(&listings), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_prefix_merge_in_key_order() {
        let agg = aggregator(vec![
            ("stores/T/H/K/G/B/stores.json", partition(&["b1"])),
            ("stores/T/H/K/G/A/stores.json", partition(&["a1", "a2"])),
            ("stores/T/H/K/G/A/notes.txt", "ignored".to_string()),
            ("stores/T/W/X/G/C/stores.json", partition(&["c1"])),
            ("services/T/H/K/G/A/services.json", partition(&["s1"])),
        ]);

        let city = LocationFilter::new().state("T").city("H");
        let listings = agg.aggregate(Kind::Stores, &city).await.unwrap();
        assert_eq!(names(&listings), vec!["a1", "a2", "b1"]);

        let all = agg.aggregate(Kind::Stores, &LocationFilter::new()).await.unwrap();
        assert_eq!(names(&all), vec!["a1", "a2", "b1", "c1"]);
    }

    #[tokio::test]
    async fn test_malformed_partition_contributes_nothing() {
        let agg = aggregator(vec![
            ("stores/T/H/K/G/A/stores.json", "{not json".to_string()),
            ("stores/T/H/K/G/B/stores.json", json!({"name": "x"}).to_string()),
            ("stores/T/H/K/G/C/stores.json", json!([1, {"name": "c"}, "s"]).to_string()),
        ]);
        let listings = agg
            .aggregate(Kind::Stores, &LocationFilter::new().state("T"))
            .await
            .unwrap();
        assert_eq!(names(&listings), vec!["c"]);
    }

    #[tokio::test]
    async fn test_missing_exact_partition_is_empty() {
        let agg = aggregator(vec![]);
        let listings = agg
            .aggregate_levels(Kind::Services, &["a", "b", "c", "d", "e"])
            .await
            .unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn test_parse_partition_keeps_unknown_fields() {
        let bytes = br#"[{"name":"x","ownerName":"Ravi"}]"#;
        let listings = parse_partition(Kind::Stores, "k", bytes);
        assert_eq!(listings[0].extra["ownerName"], json!("Ravi"));
    }
}
