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

//! Registration Gate
//!
//! Decides whether a submission is accepted and, if so, appends the new
//! listing to its partition file. Checks run in this order, and each one that
//! fails stops the submission before anything later runs:
//!
//! 1. mobile number format
//! 2. verified mobile (only when required)
//! 3. required listing fields
//! 4. quota
//!
//! The append is a read-modify-write guarded by a conditional write on the
//! version read; a lost race re-reads and tries again.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::quota::QuotaGate;
use super::verification::VerificationProvider;
use crate::core::{DirectoryError, DirectoryResult, Kind, Listing, ListingDraft, ListingStatus};
use crate::monitoring::metrics::REGISTRATIONS_TOTAL;
use crate::storage::filesystem::FilesystemError;
use crate::storage::partition::{build_key, sanitize};
use crate::storage::{BlobStoreClient, WritePrecondition};

const DEFAULT_RATING: &str = "4.0";

/// Keys a submission may not set on its own listing
const SYSTEM_FIELDS: [&str; 4] = ["status", "verified", "registeredMobile", "registrationDate"];

/// Strip everything but digits and check the Indian mobile numbering plan:
/// exactly ten digits, the first one 6-9. Country codes are not stripped.
pub fn normalize_mobile(raw: &str) -> DirectoryResult<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let valid = digits.len() == 10 && matches!(digits.as_bytes()[0], b'6'..=b'9');
    if valid {
        Ok(digits)
    } else {
        Err(DirectoryError::InvalidMobile(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    InvalidMobile,
    NotVerified,
    QuotaExceeded,
    MissingField,
}

impl RejectionReason {
    fn metric_label(&self) -> &'static str {
        match self {
            RejectionReason::InvalidMobile => "invalid_mobile",
            RejectionReason::NotVerified => "not_verified",
            RejectionReason::QuotaExceeded => "quota_exceeded",
            RejectionReason::MissingField => "missing_field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_count: Option<usize>,
}

impl RegistrationOutcome {
    fn rejected(reason: RejectionReason, message: impl Into<String>) -> Self {
        REGISTRATIONS_TOTAL
            .with_label_values(&[reason.metric_label()])
            .inc();
        Self {
            accepted: false,
            reason: Some(reason),
            message: message.into(),
            missing_fields: Vec::new(),
            partition_key: None,
            listing_id: None,
            items_count: None,
        }
    }
}

/// Turn an accepted draft into the stored listing
pub fn build_listing(kind: Kind, draft: ListingDraft, mobile: &str, now: DateTime<Utc>) -> Listing {
    let text = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();

    let mandal = text(draft.mandal);
    let id = draft
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "{}_{}_{}",
                kind.singular(),
                sanitize(&mandal).to_lowercase(),
                now.timestamp_millis()
            )
        });

    let mut extra = draft.extra;
    for field in SYSTEM_FIELDS {
        extra.remove(field);
    }

    Listing {
        id,
        name: text(draft.name),
        description: text(draft.description),
        state: text(draft.state),
        city: text(draft.city),
        mandal,
        category: text(draft.category),
        service_type: text(draft.service_type),
        phone: text(draft.phone),
        timings: text(draft.timings),
        rating: Some(
            draft
                .rating
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RATING.to_string()),
        ),
        tags: draft.tags.map(|t| t.into_tags()).unwrap_or_default(),
        address: text(draft.address),
        email: draft.email.filter(|e| !e.trim().is_empty()),
        website: draft.website.filter(|w| !w.trim().is_empty()),
        coordinates: draft.coordinates.unwrap_or_default(),
        status: ListingStatus::Pending,
        verified: false,
        registered_mobile: Some(mobile.to_string()),
        registration_date: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        extra,
    }
}

/// Existing partition contents, kept as raw JSON so foreign fields survive the rewrite
fn existing_items(key: &str, bytes: &[u8]) -> Vec<Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(items)) => items,
        _ => {
            tracing::warn!("⚠️ Partition {} is malformed, rewriting it as a fresh array", key);
            Vec::new()
        }
    }
}

pub struct RegistrationGate {
    client: BlobStoreClient,
    quota: Arc<dyn QuotaGate>,
    verifier: Option<Arc<dyn VerificationProvider>>,
    require_verified: bool,
    max_append_attempts: u32,
}

impl RegistrationGate {
    pub fn new(client: BlobStoreClient, quota: Arc<dyn QuotaGate>, max_append_attempts: u32) -> Self {
        Self {
            client,
            quota,
            verifier: None,
            require_verified: false,
            max_append_attempts: max_append_attempts.max(1),
        }
    }

    /// Attach a verification provider; with `required` unverified numbers are rejected
    pub fn with_verification(mut self, verifier: Arc<dyn VerificationProvider>, required: bool) -> Self {
        self.verifier = Some(verifier);
        self.require_verified = required;
        self
    }

    pub async fn register(
        &self,
        mobile: &str,
        draft: ListingDraft,
        kind: Kind,
    ) -> DirectoryResult<RegistrationOutcome> {
        let mobile = match normalize_mobile(mobile) {
            Ok(mobile) => mobile,
            Err(_) => {
                return Ok(RegistrationOutcome::rejected(
                    RejectionReason::InvalidMobile,
                    "Invalid Indian mobile number",
                ))
            }
        };

        if self.require_verified {
            let verified = match &self.verifier {
                Some(verifier) => verifier.is_verified(&mobile).await?,
                None => false,
            };
            if !verified {
                return Ok(RegistrationOutcome::rejected(
                    RejectionReason::NotVerified,
                    "Mobile number has not been verified",
                ));
            }
        }

        let missing = draft.missing_fields();
        if !missing.is_empty() {
            let mut outcome = RegistrationOutcome::rejected(
                RejectionReason::MissingField,
                format!("Missing required fields: {}", missing.join(", ")),
            );
            outcome.missing_fields = missing.iter().map(|f| f.to_string()).collect();
            return Ok(outcome);
        }

        if !self.quota.check_and_record(&mobile).await? {
            return Ok(RegistrationOutcome::rejected(
                RejectionReason::QuotaExceeded,
                "Registration limit reached for this mobile number",
            ));
        }

        let listing = build_listing(kind, draft, &mobile, Utc::now());
        let key = build_key(
            kind,
            &[
                listing.state.as_str(),
                listing.city.as_str(),
                listing.mandal.as_str(),
                listing.category.as_str(),
                listing.service_type.as_str(),
            ],
        )?;
        let listing_id = listing.id.clone();
        let items_count = self.append(key.as_str(), &listing).await?;

        REGISTRATIONS_TOTAL.with_label_values(&["accepted"]).inc();
        tracing::info!(
            "✅ Registered {} {} into {} ({} items)",
            kind.singular(),
            listing_id,
            key.as_str(),
            items_count
        );

        Ok(RegistrationOutcome {
            accepted: true,
            reason: None,
            message: "Business registered successfully".to_string(),
            missing_fields: Vec::new(),
            partition_key: Some(key.as_str().to_string()),
            listing_id: Some(listing_id),
            items_count: Some(items_count),
        })
    }

    /// Append `listing` to the array at `key`; returns the new array length
    async fn append(&self, key: &str, listing: &Listing) -> DirectoryResult<usize> {
        let entry = serde_json::to_value(listing)?;

        for attempt in 1..=self.max_append_attempts {
            let (mut items, precondition) = match self.client.get_versioned(key).await? {
                Some(current) => (
                    existing_items(key, &current.data),
                    WritePrecondition::IfMatch(current.etag),
                ),
                None => (Vec::new(), WritePrecondition::IfNotExists),
            };
            items.push(entry.clone());
            let body = serde_json::to_vec_pretty(&items)?;

            match self.client.put_conditional(key, &body, precondition).await {
                Ok(_) => return Ok(items.len()),
                Err(FilesystemError::PreconditionFailed { .. }) => {
                    tracing::warn!(
                        "🔁 Concurrent write on {} (attempt {}/{}), re-reading",
                        key,
                        attempt,
                        self.max_append_attempts
                    );
                }
                Err(e) => {
                    tracing::error!("❌ Append to {} failed: {}", key, e);
                    return Err(e.into());
                }
            }
        }

        Err(DirectoryError::Conflict {
            key: key.to_string(),
            attempts: self.max_append_attempts,
        })
    }
}
