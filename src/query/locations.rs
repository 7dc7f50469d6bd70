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

//! Location taxonomy derived from partition keys
//!
//! States, cities and mandals are not stored anywhere on their own. They are
//! read back out of the key paths under `stores/` and `services/`; a location
//! is known if it appears under either family. Values are returned in their
//! sanitized key form, sorted.
//!
//! `meta/locations.json` may hold a precomputed [`LocationIndex`]. It is only
//! consulted when enabled, and a cold scan always gives the same answer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::core::{DirectoryResult, Kind, Level};
use crate::storage::partition::{kind_prefix, sanitize};
use crate::storage::BlobStoreClient;

/// Key of the precomputed location index document
pub const LOCATION_INDEX_KEY: &str = "meta/locations.json";

/// Precomputed state/city/mandal tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationIndex {
    pub states: Vec<String>,
    /// state -> cities
    pub cities: BTreeMap<String, Vec<String>>,
    /// state -> city -> mandals
    pub mandals: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl LocationIndex {
    /// Build the whole tree from a set of partition keys
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut states = BTreeSet::new();
        let mut cities: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut mandals: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();

        for key in keys {
            let parts = directory_segments(key);
            if let Some(state) = parts.get(Level::State.segment_index()) {
                states.insert(state.to_string());
            }
            if let (Some(state), Some(city)) = (
                parts.get(Level::State.segment_index()),
                parts.get(Level::City.segment_index()),
            ) {
                cities
                    .entry(state.to_string())
                    .or_default()
                    .insert(city.to_string());

                if let Some(mandal) = parts.get(Level::Mandal.segment_index()) {
                    mandals
                        .entry(state.to_string())
                        .or_default()
                        .entry(city.to_string())
                        .or_default()
                        .insert(mandal.to_string());
                }
            }
        }

        Self {
            states: states.into_iter().collect(),
            cities: cities
                .into_iter()
                .map(|(state, set)| (state, set.into_iter().collect()))
                .collect(),
            mandals: mandals
                .into_iter()
                .map(|(state, by_city)| {
                    let by_city = by_city
                        .into_iter()
                        .map(|(city, set)| (city, set.into_iter().collect()))
                        .collect();
                    (state, by_city)
                })
                .collect(),
        }
    }

    pub fn cities_of(&self, state: &str) -> Vec<String> {
        self.cities.get(state).cloned().unwrap_or_default()
    }

    pub fn mandals_of(&self, state: &str, city: &str) -> Vec<String> {
        self.mandals
            .get(state)
            .and_then(|by_city| by_city.get(city))
            .cloned()
            .unwrap_or_default()
    }
}

/// Path segments of `key` that name directories: the kind plus any taxonomy
/// levels, never the trailing object name. Empty segments end the path.
fn directory_segments(key: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = key.split('/').collect();
    parts.pop();
    let valid = parts.iter().take_while(|p| !p.is_empty()).count();
    parts.truncate(valid);
    parts
}

/// Distinct values at `level` among keys whose ancestors equal `parents`
pub fn collect_level<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    parents: &[&str],
    level: Level,
) -> BTreeSet<String> {
    let idx = level.segment_index();
    keys.into_iter()
        .filter_map(|key| {
            let parts = directory_segments(key);
            let ancestors_match = parents
                .iter()
                .enumerate()
                .all(|(i, parent)| parts.get(i + 1) == Some(parent));
            if !ancestors_match {
                return None;
            }
            parts.get(idx).map(|segment| segment.to_string())
        })
        .collect()
}

/// Answer of `listLocations`: which tier was resolved depends on the inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationList {
    States(Vec<String>),
    Cities(Vec<String>),
    Mandals(Vec<String>),
}

impl LocationList {
    pub fn values(&self) -> &[String] {
        match self {
            LocationList::States(v) | LocationList::Cities(v) | LocationList::Mandals(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<String> {
        match self {
            LocationList::States(v) | LocationList::Cities(v) | LocationList::Mandals(v) => v,
        }
    }
}

#[derive(Clone)]
pub struct LocationIndexer {
    client: BlobStoreClient,
    use_index_document: bool,
}

impl LocationIndexer {
    pub fn new(client: BlobStoreClient, use_index_document: bool) -> Self {
        Self {
            client,
            use_index_document,
        }
    }

    /// Keys under `{kind}/{parents...}/` for both kinds, listed concurrently
    async fn scan(&self, parents: &[&str]) -> DirectoryResult<Vec<String>> {
        let prefix_for = |kind: Kind| {
            let mut prefix = kind_prefix(kind);
            for parent in parents {
                prefix.push_str(parent);
                prefix.push('/');
            }
            prefix
        };
        let stores_prefix = prefix_for(Kind::Stores);
        let services_prefix = prefix_for(Kind::Services);

        let (mut stores, services) = tokio::try_join!(
            self.client.list(&stores_prefix),
            self.client.list(&services_prefix)
        )?;
        stores.extend(services);
        Ok(stores)
    }

    async fn cold_level(&self, parents: &[&str], level: Level) -> DirectoryResult<Vec<String>> {
        let started = Instant::now();
        let keys = self.scan(parents).await?;
        let values: Vec<String> = collect_level(keys.iter().map(String::as_str), parents, level)
            .into_iter()
            .collect();
        tracing::debug!(
            "🗺️ {} {}(s) from {} keys in {:?}",
            values.len(),
            level.as_str(),
            keys.len(),
            started.elapsed()
        );
        Ok(values)
    }

    /// The precomputed index, if enabled and readable
    async fn index_document(&self) -> DirectoryResult<Option<LocationIndex>> {
        if !self.use_index_document {
            return Ok(None);
        }
        let Some(bytes) = self.client.get(LOCATION_INDEX_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<LocationIndex>(&bytes) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring malformed {}: {}", LOCATION_INDEX_KEY, e);
                Ok(None)
            }
        }
    }

    pub async fn all_states(&self) -> DirectoryResult<Vec<String>> {
        if let Some(index) = self.index_document().await? {
            return Ok(index.states);
        }
        self.cold_level(&[], Level::State).await
    }

    pub async fn cities_of(&self, state: &str) -> DirectoryResult<Vec<String>> {
        let state = sanitize(state);
        if let Some(index) = self.index_document().await? {
            return Ok(index.cities_of(&state));
        }
        self.cold_level(&[state.as_str()], Level::City).await
    }

    pub async fn mandals_of(&self, state: &str, city: &str) -> DirectoryResult<Vec<String>> {
        let (state, city) = (sanitize(state), sanitize(city));
        if let Some(index) = self.index_document().await? {
            return Ok(index.mandals_of(&state, &city));
        }
        self.cold_level(&[state.as_str(), city.as_str()], Level::Mandal).await
    }

    /// Mandals when both are given, cities for a state, otherwise states.
    /// A city without its state cannot be resolved and lists states.
    pub async fn list_locations(
        &self,
        state: Option<&str>,
        city: Option<&str>,
    ) -> DirectoryResult<LocationList> {
        let state = state.filter(|s| !s.is_empty());
        let city = city.filter(|c| !c.is_empty());
        Ok(match (state, city) {
            (Some(state), Some(city)) => LocationList::Mandals(self.mandals_of(state, city).await?),
            (Some(state), None) => LocationList::Cities(self.cities_of(state).await?),
            (None, _) => LocationList::States(self.all_states().await?),
        })
    }

    /// Cold computation of the full tree
    pub async fn build_index(&self) -> DirectoryResult<LocationIndex> {
        let keys = self.scan(&[]).await?;
        Ok(LocationIndex::from_keys(keys.iter().map(String::as_str)))
    }

    /// Recompute the tree and store it at [`LOCATION_INDEX_KEY`]
    pub async fn publish_index(&self) -> DirectoryResult<LocationIndex> {
        let index = self.build_index().await?;
        let body = serde_json::to_vec_pretty(&index)?;
        self.client.put(LOCATION_INDEX_KEY, &body).await?;
        tracing::info!(
            "🗺️ Published location index: {} states, {} cities",
            index.states.len(),
            index.cities.values().map(Vec::len).sum::<usize>()
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::filesystem::memory::MemoryBlobStore;
    use std::sync::Arc;
    use std::time::Duration;

    const KEYS: &[&str] = &[
        "stores/Telangana/Hyderabad/Kukatpally/Grocery/Kirana/stores.json",
        "stores/Telangana/Warangal/Hanamkonda/Grocery/Kirana/stores.json",
        "services/Andhra_Pradesh/Vijayawada/Mylavaram/Repair/Plumber/services.json",
        "services/Telangana/Hyderabad/Madhapur/Beauty/Salon/services.json",
        "stores/readme.json",
    ];

    #[test]
    fn test_collect_levels() {
        let states = collect_level(KEYS.iter().copied(), &[], Level::State);
        assert_eq!(
            states.into_iter().collect::<Vec<_>>(),
            vec!["Andhra_Pradesh", "Telangana"]
        );

        let cities = collect_level(KEYS.iter().copied(), &["Telangana"], Level::City);
        assert_eq!(cities.into_iter().collect::<Vec<_>>(), vec!["Hyderabad", "Warangal"]);

        let mandals = collect_level(KEYS.iter().copied(), &["Telangana", "Hyderabad"], Level::Mandal);
        assert_eq!(
            mandals.into_iter().collect::<Vec<_>>(),
            vec!["Kukatpally", "Madhapur"]
        );
    }

    #[test]
    fn test_index_from_keys() {
        let index = LocationIndex::from_keys(KEYS.iter().copied());
        assert_eq!(index.states, vec!["Andhra_Pradesh", "Telangana"]);
        assert_eq!(index.cities_of("Telangana"), vec!["Hyderabad", "Warangal"]);
        assert_eq!(
            index.mandals_of("Telangana", "Hyderabad"),
            vec!["Kukatpally", "Madhapur"]
        );
        assert!(index.mandals_of("Nowhere", "Hyderabad").is_empty());
    }

    fn indexer(use_doc: bool) -> (Arc<MemoryBlobStore>, LocationIndexer) {
        let store = Arc::new(MemoryBlobStore::with_objects(
            KEYS.iter().map(|k| (k.to_string(), b"[]".to_vec())),
        ));
        let client = BlobStoreClient::new(store.clone(), Duration::from_secs(5));
        (store, LocationIndexer::new(client, use_doc))
    }

    #[tokio::test]
    async fn test_list_locations_dispatch() {
        let (_store, indexer) = indexer(false);

        let states = indexer.list_locations(None, Some("Hyderabad")).await.unwrap();
        assert!(matches!(states, LocationList::States(_)));

        let cities = indexer.list_locations(Some("Andhra Pradesh"), None).await.unwrap();
        assert_eq!(cities, LocationList::Cities(vec!["Vijayawada".to_string()]));
    }

    #[tokio::test]
    async fn test_published_index_matches_cold_scan() {
        let (_store, indexer) = indexer(true);
        let cold = indexer.all_states().await.unwrap();

        let published = indexer.publish_index().await.unwrap();
        assert_eq!(published.states, cold);
        assert_eq!(indexer.all_states().await.unwrap(), cold);
        assert_eq!(
            indexer.mandals_of("Telangana", "Hyderabad").await.unwrap(),
            vec!["Kukatpally", "Madhapur"]
        );
    }
}
