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

//! Free-text and structured search over the merged listing universe

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::pager::{paginate, Pagination};
use crate::core::{DirectoryResult, Kind, KindFilter, Listing, LocationFilter, SearchFilters};
use crate::storage::PartitionAggregator;

/// A listing labelled with the family it was aggregated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedListing {
    pub kind: Kind,
    #[serde(flatten)]
    pub listing: Listing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub kind_filter: KindFilter,
    pub filters: SearchFilters,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub data: Vec<TaggedListing>,
    pub pagination: Pagination,
    pub kind_filter: KindFilter,
    pub query: Option<String>,
}

/// Case-insensitive substring match on name, description or any tag.
/// `needle` must already be lowercased.
fn matches_text(listing: &Listing, needle: &str) -> bool {
    listing.name.to_lowercase().contains(needle)
        || listing.description.to_lowercase().contains(needle)
        || listing
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

fn matches_field(value: &str, wanted: &Option<String>) -> bool {
    match wanted.as_deref() {
        Some(w) if !w.is_empty() => value == w,
        _ => true,
    }
}

fn matches_filters(listing: &Listing, filters: &SearchFilters) -> bool {
    matches_field(&listing.state, &filters.state)
        && matches_field(&listing.city, &filters.city)
        && matches_field(&listing.mandal, &filters.mandal)
        && matches_field(&listing.category, &filters.category)
        && matches_field(&listing.service_type, &filters.service_type)
}

/// Apply the text filter (skipped when `query` is empty), then every
/// structured condition. Relative order of the universe is preserved.
/// The query is matched as given; surrounding whitespace is part of it.
pub fn filter_listings(
    universe: Vec<TaggedListing>,
    query: Option<&str>,
    filters: &SearchFilters,
) -> Vec<TaggedListing> {
    let needle = query
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    universe
        .into_iter()
        .filter(|item| {
            needle
                .as_deref()
                .map_or(true, |n| matches_text(&item.listing, n))
        })
        .filter(|item| matches_filters(&item.listing, filters))
        .collect()
}

#[derive(Clone)]
pub struct SearchEngine {
    aggregator: PartitionAggregator,
}

impl SearchEngine {
    pub fn new(aggregator: PartitionAggregator) -> Self {
        Self { aggregator }
    }

    /// Full unfiltered aggregation of every kind selected, stores first
    pub async fn universe(&self, kind_filter: KindFilter) -> DirectoryResult<Vec<TaggedListing>> {
        let everything = LocationFilter::new();
        let per_kind = try_join_all(kind_filter.kinds().iter().map(|&kind| {
            let everything = &everything;
            async move {
                let listings = self.aggregator.aggregate(kind, everything).await?;
                DirectoryResult::Ok(
                    listings
                        .into_iter()
                        .map(|listing| TaggedListing { kind, listing })
                        .collect::<Vec<_>>(),
                )
            }
        }))
        .await?;

        Ok(per_kind.into_iter().flatten().collect())
    }

    pub async fn search(&self, request: &SearchRequest) -> DirectoryResult<SearchResponse> {
        let universe = self.universe(request.kind_filter).await?;
        let universe_size = universe.len();
        let matched = filter_listings(universe, request.query.as_deref(), &request.filters);

        tracing::info!(
            "🔎 Search {:?} over {:?}: {} of {} listings matched",
            request.query,
            request.kind_filter,
            matched.len(),
            universe_size
        );

        let page = paginate(matched, request.page, request.page_size)?;
        Ok(SearchResponse {
            data: page.data,
            pagination: page.pagination,
            kind_filter: request.kind_filter,
            query: request.query.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(kind: Kind, name: &str, tags: &[&str], state: &str) -> TaggedListing {
        TaggedListing {
            kind,
            listing: Listing {
                name: name.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                state: state.to_string(),
                ..Default::default()
            },
        }
    }

    fn universe() -> Vec<TaggedListing> {
        vec![
            tagged(Kind::Stores, "Blue Salon", &["beauty"], "Telangana"),
            tagged(Kind::Stores, "Red Store", &["blue"], "Telangana"),
            tagged(Kind::Services, "Green Plumbing", &["pipes"], "Karnataka"),
        ]
    }

    fn names(items: &[TaggedListing]) -> Vec<&str> {
        items.iter().map(|i| i.listing.name.as_str()).collect()
    }

    #[test]
    fn test_text_matches_name_or_tag() {
        let result = filter_listings(universe(), Some("BLUE"), &SearchFilters::default());
        assert_eq!(names(&result), vec!["Blue Salon", "Red Store"]);
    }

    #[test]
    fn test_structured_filters_are_anded() {
        let filters = SearchFilters {
            state: Some("X".to_string()),
            ..Default::default()
        };
        assert!(filter_listings(universe(), Some("blue"), &filters).is_empty());

        let filters = SearchFilters {
            state: Some("Karnataka".to_string()),
            ..Default::default()
        };
        assert_eq!(
            names(&filter_listings(universe(), None, &filters)),
            vec!["Green Plumbing"]
        );
    }

    #[test]
    fn test_empty_query_keeps_everything_in_order() {
        let result = filter_listings(universe(), Some(""), &SearchFilters::default());
        assert_eq!(
            names(&result),
            vec!["Blue Salon", "Red Store", "Green Plumbing"]
        );
    }

    #[test]
    fn test_query_whitespace_is_significant() {
        assert!(filter_listings(universe(), Some("   "), &SearchFilters::default()).is_empty());
        assert!(filter_listings(universe(), Some(" blue "), &SearchFilters::default()).is_empty());
        assert_eq!(
            names(&filter_listings(universe(), Some("blue "), &SearchFilters::default())),
            vec!["Blue Salon"]
        );
    }

    #[test]
    fn test_structured_match_is_case_sensitive() {
        let filters = SearchFilters {
            state: Some("telangana".to_string()),
            ..Default::default()
        };
        assert!(filter_listings(universe(), None, &filters).is_empty());
    }

    #[test]
    fn test_tagged_listing_shape() {
        let value = serde_json::to_value(tagged(Kind::Services, "x", &[], "s")).unwrap();
        assert_eq!(value["kind"], "services");
        assert_eq!(value["name"], "x");
    }
}
