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

//! Registration quota policies
//!
//! The gate only needs a yes/no answer per submission. Whatever backs the
//! decision (an in-process ledger here, a relational table elsewhere) sits
//! behind [`QuotaGate`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::{DirectoryResult, QuotaConfig};

#[async_trait]
pub trait QuotaGate: Send + Sync {
    /// Whether `mobile` may register now; a `true` answer is recorded as a
    /// registration in the same step.
    async fn check_and_record(&self, mobile: &str) -> DirectoryResult<bool>;

    fn policy_name(&self) -> &'static str;
}

/// Build the gate selected by configuration
pub fn from_config(config: &QuotaConfig) -> Arc<dyn QuotaGate> {
    match config {
        QuotaConfig::Windowed {
            max_registrations,
            window_days,
        } => Arc::new(WindowedQuota::new(
            *max_registrations,
            Some(Duration::days(i64::from(*window_days))),
        )),
        QuotaConfig::Once => Arc::new(WindowedQuota::once()),
        QuotaConfig::Unlimited => Arc::new(UnlimitedQuota),
    }
}

/// Checks between sweeps of numbers whose registrations have all aged out
const SWEEP_EVERY: u64 = 1024;

/// At most `max` registrations per mobile inside a trailing window.
/// Without a window every earlier registration counts forever, so the
/// `once` ledger keeps one entry per number for the life of the process.
#[derive(Debug)]
pub struct WindowedQuota {
    max: u32,
    window: Option<Duration>,
    ledger: DashMap<String, Vec<DateTime<Utc>>>,
    checks: AtomicU64,
}

impl WindowedQuota {
    pub fn new(max: u32, window: Option<Duration>) -> Self {
        Self {
            max,
            window,
            ledger: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    /// One registration per number, ever
    pub fn once() -> Self {
        Self::new(1, None)
    }

    /// Check-and-record against an explicit clock
    pub fn check_and_record_at(&self, mobile: &str, now: DateTime<Utc>) -> bool {
        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.sweep(now);
        }

        // The entry guard holds the shard lock, so concurrent submissions for
        // one number are decided one at a time.
        let mut entry = self.ledger.entry(mobile.to_string()).or_default();
        if let Some(window) = self.window {
            entry.retain(|at| now.signed_duration_since(*at) < window);
        }
        if entry.len() >= self.max as usize {
            return false;
        }
        entry.push(now);
        true
    }

    /// Drop numbers with no registration inside the window; returns how many went
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let Some(window) = self.window else {
            return 0;
        };
        let before = self.ledger.len();
        self.ledger.retain(|_, entries| {
            entries.retain(|at| now.signed_duration_since(*at) < window);
            !entries.is_empty()
        });
        let removed = before.saturating_sub(self.ledger.len());
        if removed > 0 {
            tracing::debug!("Quota ledger sweep released {} numbers", removed);
        }
        removed
    }
}

#[async_trait]
impl QuotaGate for WindowedQuota {
    async fn check_and_record(&self, mobile: &str) -> DirectoryResult<bool> {
        let allowed = self.check_and_record_at(mobile, Utc::now());
        tracing::debug!(
            "Quota check ({}): {}",
            self.policy_name(),
            if allowed { "allowed" } else { "exhausted" }
        );
        Ok(allowed)
    }

    fn policy_name(&self) -> &'static str {
        if self.window.is_some() {
            "windowed"
        } else {
            "once"
        }
    }
}

/// Every submission passes
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlimitedQuota;

#[async_trait]
impl QuotaGate for UnlimitedQuota {
    async fn check_and_record(&self, _mobile: &str) -> DirectoryResult<bool> {
        Ok(true)
    }

    fn policy_name(&self) -> &'static str {
        "unlimited"
    }
}
