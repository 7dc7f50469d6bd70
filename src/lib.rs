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

//! # BizDir - Hierarchical Business Directory Engine
//!
//! BizDir serves store and service listings kept in a partitioned blob store.
//! Every listing lives in the JSON array at
//! `{kind}/{state}/{city}/{mandal}/{category}/{type}/{kind}.json`.
//!
//! ## Key Features
//!
//! - **Hierarchical queries**: any prefix of the five-level taxonomy narrows the scan
//! - **Concurrent aggregation**: partition files are fetched in parallel, merged in key order
//! - **Search**: case-insensitive text match plus exact structured filters
//! - **Registration**: quota-gated appends guarded by conditional writes
//! - **Pluggable storage**: local directory or in-memory backends

pub mod core;
pub mod monitoring;
pub mod network;
pub mod query;
pub mod services;
pub mod storage;

pub use crate::core::*;
use std::net::SocketAddr;
use std::sync::Arc;

pub use services::DirectoryService;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Main BizDir instance: the directory service plus its REST server
pub struct BizDir {
    service: Arc<DirectoryService>,
    server: Option<network::RunningServer>,
    config: core::Config,
}

impl BizDir {
    pub async fn new(config: core::Config) -> Result<Self> {
        tracing::info!("🚀 BizDir::new - opening store {}", config.storage.url);
        let service = DirectoryService::from_config(&config).await?;
        Ok(Self::with_service(Arc::new(service), config))
    }

    /// Wrap an already constructed service
    pub fn with_service(service: Arc<DirectoryService>, config: core::Config) -> Self {
        if config.monitoring.metrics_enabled {
            monitoring::init_metrics();
        }
        Self {
            service,
            server: None,
            config,
        }
    }

    pub fn service(&self) -> Arc<DirectoryService> {
        self.service.clone()
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.server.is_some() {
            return Ok(());
        }

        let rest_addr: SocketAddr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        )
        .parse()
        .map_err(|e| format!("Invalid REST address: {}", e))?;

        let server = network::RestServer::new(
            rest_addr,
            self.service.clone(),
            self.config.monitoring.metrics_enabled,
        )
        .spawn()
        .map_err(|e| format!("Failed to start REST server: {}", e))?;

        self.server = Some(server);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(server) = self.server.take() {
            server
                .shutdown()
                .await
                .map_err(|e| format!("Failed to stop REST server: {}", e))?;
        }
        Ok(())
    }

    /// Check if the server is running
    pub fn is_server_running(&self) -> bool {
        self.server.as_ref().map_or(false, |s| !s.is_finished())
    }

    /// Get HTTP server address
    pub fn http_server_address(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.local_addr())
    }
}
