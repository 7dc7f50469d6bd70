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

//! Directory Service
//!
//! Single entry point shared by the REST layer and embedders. Owns one blob
//! store client and wires the aggregator, search, location index, catalog and
//! registration gate on top of it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::catalog_service::{CatalogService, CategoryMap};
use super::quota::{self, QuotaGate};
use super::registration_service::{RegistrationGate, RegistrationOutcome};
use super::verification::{SimulatedVerifier, VerificationProvider, VerificationTicket, VerifyStatus};
use crate::core::{
    Config, DirectoryResult, HierarchyStep, Kind, Listing, ListingDraft, LocationFilter, QueryConfig,
};
use crate::monitoring::OperationTimer;
use crate::query::{
    paginate, LocationIndex, LocationIndexer, LocationList, Page, Pagination, SearchEngine,
    SearchRequest, SearchResponse,
};
use crate::storage::{BlobStoreClient, PartitionAggregator};

/// Result of `listRecords`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsResponse {
    pub data: Vec<Listing>,
    pub pagination: Pagination,
    pub filters: LocationFilter,
    pub hierarchy_path: Vec<HierarchyStep>,
}

async fn timed<T, F>(operation: &'static str, fut: F) -> DirectoryResult<T>
where
    F: Future<Output = DirectoryResult<T>>,
{
    let timer = OperationTimer::start(operation);
    let result = fut.await;
    if let Err(e) = &result {
        if e.is_client_error() {
            tracing::debug!("{} rejected: {}", operation, e);
        } else {
            tracing::error!("❌ {} failed: {}", operation, e);
        }
    }
    timer.finish(&result);
    result
}

pub struct DirectoryService {
    query: QueryConfig,
    client: BlobStoreClient,
    aggregator: PartitionAggregator,
    search: SearchEngine,
    locations: LocationIndexer,
    catalog: CatalogService,
    registration: RegistrationGate,
    verifier: Arc<dyn VerificationProvider>,
}

impl DirectoryService {
    /// Open the blob store named in `config.storage.url` and build the service
    pub async fn from_config(config: &Config) -> DirectoryResult<Self> {
        let client = BlobStoreClient::from_url(
            &config.storage.url,
            Duration::from_millis(config.storage.request_timeout_ms),
        )
        .await?;
        Ok(Self::new(client, config))
    }

    /// Service over an existing client, collaborators chosen by `config`
    pub fn new(client: BlobStoreClient, config: &Config) -> Self {
        let quota = quota::from_config(&config.registration.quota);
        let verifier = Arc::new(SimulatedVerifier::new(
            config.registration.otp_ttl_seconds,
            config.registration.expose_verification_codes,
        ));
        Self::with_collaborators(client, config, quota, verifier)
    }

    /// Service with caller-supplied quota and verification collaborators
    pub fn with_collaborators(
        client: BlobStoreClient,
        config: &Config,
        quota: Arc<dyn QuotaGate>,
        verifier: Arc<dyn VerificationProvider>,
    ) -> Self {
        let aggregator = PartitionAggregator::new(client.clone(), config.storage.max_concurrent_fetches);
        let registration = RegistrationGate::new(client.clone(), quota, config.storage.max_append_retries)
            .with_verification(verifier.clone(), config.registration.require_verified_mobile);

        tracing::info!(
            "🔧 DirectoryService ready on {} store (quota: {:?})",
            client.store_type(),
            config.registration.quota
        );

        Self {
            query: config.query.clone(),
            search: SearchEngine::new(aggregator.clone()),
            locations: LocationIndexer::new(client.clone(), config.query.use_location_index_document),
            catalog: CatalogService::new(client.clone()),
            client,
            aggregator,
            registration,
            verifier,
        }
    }

    pub fn store_type(&self) -> &'static str {
        self.client.store_type()
    }

    fn page_size(&self, requested: Option<i64>, default: i64) -> i64 {
        requested.unwrap_or(default).min(self.query.max_page_size)
    }

    pub async fn list_locations(
        &self,
        state: Option<&str>,
        city: Option<&str>,
    ) -> DirectoryResult<LocationList> {
        timed("list_locations", self.locations.list_locations(state, city)).await
    }

    pub async fn categories(&self) -> DirectoryResult<CategoryMap> {
        timed("list_categories", self.catalog.categories()).await
    }

    pub async fn list_categories(&self, kind: Kind) -> DirectoryResult<Value> {
        timed("list_categories", self.catalog.categories_for(kind)).await
    }

    pub async fn about(&self) -> DirectoryResult<Value> {
        timed("about", self.catalog.about()).await
    }

    pub async fn ads(&self) -> DirectoryResult<Value> {
        timed("ads", self.catalog.ads()).await
    }

    /// Listings of `kind` under `filter`, one page at a time
    pub async fn list_records(
        &self,
        kind: Kind,
        filter: LocationFilter,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> DirectoryResult<RecordsResponse> {
        let page_size = self.page_size(page_size, self.query.default_page_size);
        timed("list_records", async move {
            let listings = self.aggregator.aggregate(kind, &filter).await?;
            let page = paginate(listings, page.unwrap_or(1), page_size)?;
            Ok(RecordsResponse {
                data: page.data,
                pagination: page.pagination,
                hierarchy_path: filter.hierarchy_path(),
                filters: filter,
            })
        })
        .await
    }

    /// Every listing of `kind`, unfiltered
    pub async fn list_all(
        &self,
        kind: Kind,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> DirectoryResult<Page<Listing>> {
        let page_size = self.page_size(page_size, self.query.flat_page_size);
        timed("list_all", async move {
            let listings = self.aggregator.aggregate(kind, &LocationFilter::new()).await?;
            paginate(listings, page.unwrap_or(1), page_size)
        })
        .await
    }

    /// Search with `page_size` clamped; `0` page size falls back to the default
    pub async fn search(&self, mut request: SearchRequest) -> DirectoryResult<SearchResponse> {
        let requested = (request.page_size != 0).then_some(request.page_size);
        request.page_size = self.page_size(requested, self.query.default_page_size);
        timed("search", async move { self.search.search(&request).await }).await
    }

    pub async fn register(
        &self,
        mobile: &str,
        draft: ListingDraft,
        kind: Kind,
    ) -> DirectoryResult<RegistrationOutcome> {
        timed("register", self.registration.register(mobile, draft, kind)).await
    }

    pub async fn send_code(&self, phone: &str) -> DirectoryResult<VerificationTicket> {
        timed("send_code", self.verifier.send_code(phone)).await
    }

    pub async fn verify_code(&self, phone: &str, code: &str) -> DirectoryResult<VerifyStatus> {
        timed("verify_code", self.verifier.verify_code(phone, code)).await
    }

    /// Recompute and store the location index document
    pub async fn publish_location_index(&self) -> DirectoryResult<LocationIndex> {
        timed("publish_location_index", self.locations.publish_index()).await
    }
}
