//! Worker configuration and page control messages.

use serde::{Deserialize, Serialize};
use url::Url;

use pwakit_cache::CacheNames;
use pwakit_router::{HostMatcher, RouterConfig};

use crate::WorkerError;

/// Worker configuration: the only environment-specific surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// The worker's own origin.
    pub origin: Url,

    /// Cache generation token (e.g. `"v3"`), encoded into partition names.
    /// Bumping it is the only cache-invalidation mechanism.
    pub cache_generation: String,

    /// Ordered, origin-relative paths that must all be fetchable at install
    /// time.
    pub static_manifest: Vec<String>,

    /// Origin-relative path of the offline fallback document.
    pub offline_fallback: String,

    /// Substring matched against request hosts to identify backend
    /// data-service traffic.
    pub data_service_host: String,
}

impl WorkerConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, WorkerError> {
        let config: WorkerConfig =
            serde_json::from_str(raw).map_err(|e| WorkerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.origin.scheme() != "https" {
            return Err(WorkerError::Config(format!(
                "worker origin must be https, got {}",
                self.origin.scheme()
            )));
        }
        if self.origin.host_str().is_none() {
            return Err(WorkerError::Config("worker origin has no host".to_string()));
        }
        if self.cache_generation.is_empty() {
            return Err(WorkerError::Config("cache generation is empty".to_string()));
        }
        if !self.offline_fallback.starts_with('/') {
            return Err(WorkerError::Config(format!(
                "offline fallback must be origin-relative: {}",
                self.offline_fallback
            )));
        }
        for path in &self.static_manifest {
            if !path.starts_with('/') {
                return Err(WorkerError::Config(format!(
                    "manifest entry must be origin-relative: {}",
                    path
                )));
            }
        }
        if self.data_service_host.is_empty() {
            return Err(WorkerError::Config("data service host is empty".to_string()));
        }
        Ok(())
    }

    /// Partition names for this configuration's generation.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(self.cache_generation.as_str())
    }

    /// Derive the router configuration.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            origin: self.origin.clone(),
            data_host: HostMatcher::new(self.data_service_host.as_str()),
            dynamic_partition: self.cache_names().dynamic_partition(),
            offline_fallback: self.offline_fallback.clone(),
        }
    }
}

/// Recognized page → worker control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Force a waiting worker into activation without waiting for old tabs
    /// to close.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

/// Parse a raw control message. Any unrecognized shape yields `None`; the
/// caller ignores it without error.
pub fn parse_control_message(raw: &str) -> Option<ControlMessage> {
    serde_json::from_str(raw).ok()
}
