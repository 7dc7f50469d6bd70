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

//! REST server implementation using axum

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{create_router, AppState};
use crate::services::DirectoryService;

/// REST server for BizDir
pub struct RestServer {
    router: Router,
    bind_addr: SocketAddr,
}

/// A server accepting connections in a background task
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), hyper::Error>>,
}

impl RunningServer {
    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop accepting, drain in-flight requests, and wait for the task
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await??;
        tracing::info!("🛑 REST server on {} stopped", self.local_addr);
        Ok(())
    }
}

impl RestServer {
    /// Create new REST server
    pub fn new(bind_addr: SocketAddr, service: Arc<DirectoryService>, metrics_enabled: bool) -> Self {
        let state = AppState {
            service,
            metrics_enabled,
        };

        let router = create_router(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        );

        Self { router, bind_addr }
    }

    /// Router with every layer applied
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    fn log_endpoints(addr: SocketAddr) {
        tracing::info!("✅ REST server listening on {}", addr);
        tracing::info!("📋 Available endpoints:");
        tracing::info!("   GET    /api/health                 - Health check");
        tracing::info!("   GET    /api/about | /api/ads       - Meta documents");
        tracing::info!("   GET    /api/locations              - States, cities, mandals");
        tracing::info!("   GET    /api/categories             - Category map");
        tracing::info!("   GET    /api/stores | /api/services - Listings by hierarchy");
        tracing::info!("   GET    /api/all-stores | /api/all-services - Flat listings");
        tracing::info!("   POST   /api/search                 - Text and structured search");
        tracing::info!("   POST   /api/register               - Register a listing");
        tracing::info!("   POST   /api/verification/send|verify - Mobile verification");
        tracing::info!("   GET    /metrics                    - Prometheus metrics");
    }

    /// Bind and serve in a background task until [`RunningServer::shutdown`]
    pub fn spawn(self) -> anyhow::Result<RunningServer> {
        tracing::info!("🌐 Starting REST server on {}", self.bind_addr);

        let server = axum::Server::try_bind(&self.bind_addr)?
            .serve(self.router.into_make_service());
        let local_addr = server.local_addr();
        Self::log_endpoints(local_addr);

        let (tx, rx) = oneshot::channel::<()>();
        let graceful = server.with_graceful_shutdown(async {
            let _ = rx.await;
        });
        let handle = tokio::spawn(graceful);

        Ok(RunningServer {
            local_addr,
            shutdown: Some(tx),
            handle,
        })
    }
}
