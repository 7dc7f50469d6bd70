/*
 * Copyright 2024 Vijaykumar Singh
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

//! BizDir Server - REST front end for the business directory

use anyhow::Context;
use bizdir::{BizDir, Config};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bizdir-server")]
#[command(about = "Hierarchical business directory server")]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long)]
    port: Option<u16>,

    /// Blob store URL (`memory://`, `file:///path` or a directory)
    #[arg(short, long)]
    storage_url: Option<String>,

    #[arg(short, long)]
    log_level: Option<String>,

    /// Rebuild meta/locations.json from partition keys before serving
    #[arg(long)]
    publish_location_index: bool,
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str::<Config>(&config_str).with_context(|| format!("parsing {}", path.display()))
}

/// Console logging plus an optional daily file; the guard must outlive the server
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.monitoring.log_level));
    let console = fmt::layer().with_target(true).with_line_number(true);

    match &config.monitoring.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "bizdir.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_exists = args.config.exists();

    // Load configuration
    let mut config = load_config(&args.config)?;

    // Override with CLI arguments
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.storage_url {
        config.storage.url = url;
    }
    if let Some(level) = args.log_level {
        config.monitoring.log_level = level;
    }

    let _log_guard = init_tracing(&config);
    if !config_exists {
        info!("Configuration file {} not found, using defaults", args.config.display());
    }
    info!("Starting BizDir server with config: {:?}", config);

    let mut directory = BizDir::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open directory: {}", e))?;

    if args.publish_location_index {
        let index = directory.service().publish_location_index().await?;
        info!("🗺️ Location index published ({} states)", index.states.len());
    }

    if let Err(e) = directory.start().await {
        error!("Failed to start BizDir: {}", e);
        return Err(anyhow::anyhow!("{}", e));
    }

    info!(
        "BizDir server started on {:?}",
        directory.http_server_address()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, stopping server...");

    // Graceful shutdown
    if let Err(e) = directory.stop().await {
        error!("Error during shutdown: {}", e);
    }

    info!("BizDir server stopped");
    Ok(())
}
