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

//! Partition key layout
//!
//! Every record family lives under its own prefix and is partitioned by the
//! full five-level taxonomy path:
//!
//! ```text
//! {kind}/{state}/{city}/{mandal}/{category}/{type}/{kind}.json
//! ```
//!
//! Each level value is sanitized before use, so a partial path is always a
//! strict key prefix of every full path beneath it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{DirectoryError, DirectoryResult, Kind, Level};

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^A-Za-z0-9]").expect("static pattern compiles"));

/// Replace every character outside `[A-Za-z0-9]` with `_`
pub fn sanitize(value: &str) -> String {
    UNSAFE_CHARS.replace_all(value, "_").into_owned()
}

/// Result of resolving a set of levels against the key layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKey {
    /// All five levels: the single partition object
    Exact(String),
    /// Fewer than five: every object under this prefix (ends with `/`)
    Prefix(String),
}

impl PartitionKey {
    pub fn as_str(&self) -> &str {
        match self {
            PartitionKey::Exact(key) | PartitionKey::Prefix(key) => key,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, PartitionKey::Exact(_))
    }
}

/// Prefix covering every partition of `kind`
pub fn kind_prefix(kind: Kind) -> String {
    format!("{}/", kind.as_str())
}

/// Build the object key (five levels) or scan prefix (one to four levels)
pub fn build_key(kind: Kind, levels: &[&str]) -> DirectoryResult<PartitionKey> {
    if levels.is_empty() || levels.len() > Level::COUNT {
        return Err(DirectoryError::InvalidLevels(format!(
            "expected 1 to {} levels, got {}",
            Level::COUNT,
            levels.len()
        )));
    }

    let mut key = String::from(kind.as_str());
    for level in levels {
        key.push('/');
        key.push_str(&sanitize(level));
    }

    if levels.len() == Level::COUNT {
        key.push('/');
        key.push_str(kind.file_name());
        Ok(PartitionKey::Exact(key))
    } else {
        key.push('/');
        Ok(PartitionKey::Prefix(key))
    }
}

/// Whether `key` is a partition object of `kind` (as opposed to a sidecar file)
pub fn is_partition_object(kind: Kind, key: &str) -> bool {
    key.rsplit('/').next() == Some(kind.file_name())
}
