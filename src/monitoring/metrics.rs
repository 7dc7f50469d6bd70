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

//! Prometheus metrics for directory operations

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Once;
use std::time::Instant;

static INIT: Once = Once::new();

lazy_static! {
    /// Registry exposed on `/metrics`
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bizdir_requests_total", "Directory operations served"),
        &["operation"]
    ).expect("metric can be created");

    pub static ref REQUEST_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bizdir_request_errors_total", "Directory operations that returned an error"),
        &["operation"]
    ).expect("metric can be created");

    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("bizdir_request_duration_seconds", "Directory operation latency in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("metric can be created");

    pub static ref PARTITION_FILES_FETCHED: IntCounterVec = IntCounterVec::new(
        Opts::new("bizdir_partition_files_fetched_total", "Partition objects read during aggregation"),
        &["kind"]
    ).expect("metric can be created");

    pub static ref MALFORMED_PARTITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("bizdir_malformed_partitions_total", "Partition objects skipped because they were not a JSON array"),
        &["kind"]
    ).expect("metric can be created");

    pub static ref REGISTRATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bizdir_registrations_total", "Registration submissions by outcome"),
        &["outcome"]
    ).expect("metric can be created");
}

pub fn init() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(REQUESTS_TOTAL.clone()))
            .expect("requests_total can be registered");
        REGISTRY
            .register(Box::new(REQUEST_ERRORS_TOTAL.clone()))
            .expect("request_errors_total can be registered");
        REGISTRY
            .register(Box::new(REQUEST_DURATION.clone()))
            .expect("request_duration can be registered");
        REGISTRY
            .register(Box::new(PARTITION_FILES_FETCHED.clone()))
            .expect("partition_files_fetched can be registered");
        REGISTRY
            .register(Box::new(MALFORMED_PARTITIONS.clone()))
            .expect("malformed_partitions can be registered");
        REGISTRY
            .register(Box::new(REGISTRATIONS_TOTAL.clone()))
            .expect("registrations_total can be registered");
    });
}

/// Prometheus text exposition of everything in [`REGISTRY`]
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Times one directory operation; counts it on [`OperationTimer::finish`]
pub struct OperationTimer {
    operation: &'static str,
    started: Instant,
}

impl OperationTimer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            operation,
            started: Instant::now(),
        }
    }

    pub fn finish<T, E>(self, result: &Result<T, E>) {
        REQUESTS_TOTAL.with_label_values(&[self.operation]).inc();
        if result.is_err() {
            REQUEST_ERRORS_TOTAL.with_label_values(&[self.operation]).inc();
        }
        REQUEST_DURATION
            .with_label_values(&[self.operation])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        init();
        init();
    }

    #[test]
    fn test_timer_counts_errors() {
        let before = REQUEST_ERRORS_TOTAL.with_label_values(&["unit_timer"]).get();
        OperationTimer::start("unit_timer").finish::<(), &str>(&Err("boom"));
        OperationTimer::start("unit_timer").finish::<(), &str>(&Ok(()));
        assert_eq!(
            REQUEST_ERRORS_TOTAL.with_label_values(&["unit_timer"]).get(),
            before + 1
        );
        assert!(REQUESTS_TOTAL.with_label_values(&["unit_timer"]).get() >= 2);
    }

    #[test]
    fn test_text_exposition() {
        init();
        REGISTRATIONS_TOTAL.with_label_values(&["accepted"]).inc();
        assert!(gather_text().contains("bizdir_registrations_total"));
    }
}
