use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub query: QueryConfig,
    pub registration: RegistrationConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory://`, `file:///abs/path` or a bare local directory
    pub url: String,
    /// Per blob-store call; an elapsed call surfaces as `StoreUnavailable`
    pub request_timeout_ms: u64,
    /// Fan-out width for partition fetches inside one aggregation
    pub max_concurrent_fetches: usize,
    /// Conditional-write attempts for one registration append
    pub max_append_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_page_size: i64,
    pub flat_page_size: i64,
    pub max_page_size: i64,
    /// Answer location queries from `meta/locations.json` when it exists
    pub use_location_index_document: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub require_verified_mobile: bool,
    pub otp_ttl_seconds: u64,
    /// Echo simulated verification codes back to the caller
    pub expose_verification_codes: bool,
    pub quota: QuotaConfig,
}

/// Registration quota policy, selected by `policy = "..."`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum QuotaConfig {
    /// At most `max_registrations` per mobile inside a trailing window
    Windowed {
        #[serde(default = "default_max_registrations")]
        max_registrations: u32,
        #[serde(default = "default_window_days")]
        window_days: u32,
    },
    /// Any earlier registration exhausts the quota permanently
    Once,
    /// Every submission passes
    Unlimited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub metrics_enabled: bool,
    pub log_level: String,
    pub log_dir: Option<std::path::PathBuf>,
}

fn default_max_registrations() -> u32 {
    2
}

fn default_window_days() -> u32 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "./data".to_string(),
            request_timeout_ms: 10_000,
            max_concurrent_fetches: (num_cpus::get() * 4).max(8),
            max_append_retries: 5,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            flat_page_size: 20,
            max_page_size: 100,
            use_location_index_document: false,
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            require_verified_mobile: false,
            otp_ttl_seconds: 600,
            expose_verification_codes: false,
            quota: QuotaConfig::default(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        QuotaConfig::Windowed {
            max_registrations: default_max_registrations(),
            window_days: default_window_days(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}
