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

//! One-time-code verification of mobile numbers
//!
//! [`SimulatedVerifier`] keeps codes in memory and writes them to the log
//! instead of sending an SMS.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::registration_service::normalize_mobile;
use crate::core::DirectoryResult;

/// Receipt for an issued code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Only populated when codes are exposed for testing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerifyStatus {
    Verified,
    NoCodeRequested,
    Expired,
    Mismatch,
}

impl VerifyStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyStatus::Verified)
    }

    pub fn message(&self) -> &'static str {
        match self {
            VerifyStatus::Verified => "Mobile number verified successfully",
            VerifyStatus::NoCodeRequested => "No code requested for this number",
            VerifyStatus::Expired => "Code has expired. Please request a new one.",
            VerifyStatus::Mismatch => "Invalid code. Please try again.",
        }
    }
}

#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Issue a fresh code for `phone`, replacing any outstanding one
    async fn send_code(&self, phone: &str) -> DirectoryResult<VerificationTicket>;

    /// Check `code` for `phone`; a correct code is consumed and marks the number verified
    async fn verify_code(&self, phone: &str, code: &str) -> DirectoryResult<VerifyStatus>;

    async fn is_verified(&self, phone: &str) -> DirectoryResult<bool>;
}

const MAX_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SimulatedVerifier {
    ttl: Duration,
    expose_codes: bool,
    pending: DashMap<String, PendingCode>,
    verified: DashMap<String, DateTime<Utc>>,
}

impl SimulatedVerifier {
    pub fn new(ttl_seconds: u64, expose_codes: bool) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64),
            expose_codes,
            pending: DashMap::new(),
            verified: DashMap::new(),
        }
    }

    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..1_000_000).to_string()
    }

    /// Verification against an explicit clock
    pub fn verify_code_at(&self, mobile: &str, code: &str, now: DateTime<Utc>) -> VerifyStatus {
        let Some((_, pending)) = self.pending.remove(mobile) else {
            return VerifyStatus::NoCodeRequested;
        };
        if now > pending.expires_at {
            return VerifyStatus::Expired;
        }
        if pending.code != code.trim() {
            // keep the code for another attempt
            self.pending.insert(mobile.to_string(), pending);
            return VerifyStatus::Mismatch;
        }
        self.verified.insert(mobile.to_string(), now);
        VerifyStatus::Verified
    }
}

#[async_trait]
impl VerificationProvider for SimulatedVerifier {
    async fn send_code(&self, phone: &str) -> DirectoryResult<VerificationTicket> {
        let mobile = normalize_mobile(phone)?;
        let code = Self::generate_code();
        let expires_at = Utc::now() + self.ttl;

        self.pending.insert(
            mobile.clone(),
            PendingCode {
                code: code.clone(),
                expires_at,
            },
        );
        tracing::info!("📱 Verification code for +91{}: {} (simulated delivery)", mobile, code);

        Ok(VerificationTicket {
            token: uuid::Uuid::new_v4().to_string(),
            expires_at,
            code: self.expose_codes.then_some(code),
        })
    }

    async fn verify_code(&self, phone: &str, code: &str) -> DirectoryResult<VerifyStatus> {
        let mobile = normalize_mobile(phone)?;
        Ok(self.verify_code_at(&mobile, code, Utc::now()))
    }

    async fn is_verified(&self, phone: &str) -> DirectoryResult<bool> {
        let mobile = normalize_mobile(phone)?;
        Ok(self.verified.contains_key(&mobile))
    }
}
