use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DirectoryError;

/// The two parallel record families. Each owns its own top-level key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Stores,
    Services,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Stores, Kind::Services];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Stores => "stores",
            Kind::Services => "services",
        }
    }

    /// Name of the JSON array file at the bottom of every partition path
    pub fn file_name(&self) -> &'static str {
        match self {
            Kind::Stores => "stores.json",
            Kind::Services => "services.json",
        }
    }

    /// Singular form used when generating listing ids
    pub fn singular(&self) -> &'static str {
        match self {
            Kind::Stores => "store",
            Kind::Services => "service",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stores" => Ok(Kind::Stores),
            "services" => Ok(Kind::Services),
            other => Err(DirectoryError::InvalidKind(other.to_string())),
        }
    }
}

/// Search universe selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    Stores,
    Services,
    #[default]
    All,
}

impl KindFilter {
    /// Kinds included in the universe, stores first
    pub fn kinds(&self) -> &'static [Kind] {
        match self {
            KindFilter::Stores => &[Kind::Stores],
            KindFilter::Services => &[Kind::Services],
            KindFilter::All => &Kind::ALL,
        }
    }
}

impl FromStr for KindFilter {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stores" => Ok(KindFilter::Stores),
            "services" => Ok(KindFilter::Services),
            "all" => Ok(KindFilter::All),
            other => Err(DirectoryError::InvalidKind(other.to_string())),
        }
    }
}

/// One position in the fixed five-level taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    State,
    City,
    Mandal,
    Category,
    Type,
}

impl Level {
    pub const COUNT: usize = 5;
    pub const ALL: [Level; Level::COUNT] = [
        Level::State,
        Level::City,
        Level::Mandal,
        Level::Category,
        Level::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::State => "state",
            Level::City => "city",
            Level::Mandal => "mandal",
            Level::Category => "category",
            Level::Type => "type",
        }
    }

    /// Segment index of this level inside a partition key (`kind` is segment 0)
    pub fn segment_index(&self) -> usize {
        match self {
            Level::State => 1,
            Level::City => 2,
            Level::Mandal => 3,
            Level::Category => 4,
            Level::Type => 5,
        }
    }
}

/// Hierarchical filter used by `listRecords`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFilter {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub mandal: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
}

/// One `{level, value}` step of the hierarchy breadcrumb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyStep {
    pub level: Level,
    pub value: String,
}

impl LocationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, value: impl Into<String>) -> Self {
        self.state = Some(value.into());
        self
    }

    pub fn city(mut self, value: impl Into<String>) -> Self {
        self.city = Some(value.into());
        self
    }

    pub fn mandal(mut self, value: impl Into<String>) -> Self {
        self.mandal = Some(value.into());
        self
    }

    pub fn category(mut self, value: impl Into<String>) -> Self {
        self.category = Some(value.into());
        self
    }

    pub fn service_type(mut self, value: impl Into<String>) -> Self {
        self.service_type = Some(value.into());
        self
    }

    fn slots(&self) -> [(Level, Option<&str>); Level::COUNT] {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        [
            (Level::State, present(&self.state)),
            (Level::City, present(&self.city)),
            (Level::Mandal, present(&self.mandal)),
            (Level::Category, present(&self.category)),
            (Level::Type, present(&self.service_type)),
        ]
    }

    /// Longest contiguous run of supplied levels starting at `state`.
    ///
    /// A level supplied without its parent cannot narrow a prefix scan, so it
    /// (and everything after the gap) is ignored when choosing partitions.
    pub fn levels(&self) -> Vec<&str> {
        self.slots()
            .iter()
            .map_while(|(_, value)| *value)
            .collect()
    }

    /// Every supplied level, in taxonomy order, regardless of gaps
    pub fn hierarchy_path(&self) -> Vec<HierarchyStep> {
        self.slots()
            .iter()
            .filter_map(|(level, value)| {
                value.map(|v| HierarchyStep {
                    level: *level,
                    value: v.to_string(),
                })
            })
            .collect()
    }
}

/// Structured (exact-match) conditions applied by search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub mandal: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "type")]
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

/// Moderation state of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl<'de> Deserialize<'de> for ListingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("approved") => ListingStatus::Approved,
            Some("rejected") => ListingStatus::Rejected,
            _ => ListingStatus::Pending,
        })
    }
}

/// A store or service record, one element of a partition file's array.
///
/// Partition files are hand-edited as often as they are generated, so every
/// field tolerates absence and `null`, ids and ratings accept numbers, and
/// unrecognised keys are carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub mandal: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub service_type: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timings: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub verified: bool,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub registered_mobile: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Tags arrive either as an array or as a comma separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        TagsInput::List(Vec::new())
    }
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        let raw = match self {
            TagsInput::List(tags) => tags,
            TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Submission payload for a new listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub mandal: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub timings: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub rating: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ListingDraft {
    /// Fields a submission cannot be accepted without
    pub const REQUIRED_FIELDS: [&'static str; 7] = [
        "name",
        "state",
        "city",
        "mandal",
        "category",
        "serviceType",
        "phone",
    ];

    fn required_value(&self, field: &str) -> Option<&str> {
        let value = match field {
            "name" => &self.name,
            "state" => &self.state,
            "city" => &self.city,
            "mandal" => &self.mandal,
            "category" => &self.category,
            "serviceType" => &self.service_type,
            "phone" => &self.phone,
            _ => return None,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Required fields that are absent or blank, in declaration order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        Self::REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| self.required_value(field).is_none())
            .collect()
    }
}

mod lenient {
    use super::*;

    /// Accepts a string, a number, a bool or null
    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(opt_string(deserializer)?.unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(s) => Ok(Some(s)),
            serde_json::Value::Number(n) => Ok(Some(n.to_string())),
            serde_json::Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(de::Error::custom(format!(
                "expected a scalar value, found {}",
                other
            ))),
        }
    }

    /// Treats `null` as the type's default
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}
