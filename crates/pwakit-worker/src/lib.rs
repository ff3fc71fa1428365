//! # PWAKit Worker
//!
//! Service worker lifecycle and fetch handling for the PWAKit offline-worker
//! toolkit.
//!
//! ## Architecture
//!
//! ```text
//! Registration
//!     ├── waiting (ServiceWorker, installed)
//!     └── active  (ServiceWorker, routing fetches)
//!
//! ServiceWorker
//!     ├── WorkerConfig   (manifest, generation, fallback, data host)
//!     ├── CacheStore     (injected)
//!     └── CacheRouter    (classification + strategies)
//! ```
//!
//! A worker version moves through
//! `Parsed → Installing → Installed → Activating → Activated`; install is
//! all-or-nothing over the static asset manifest, activation purges every
//! cache partition the current generation does not own, and fetches are
//! rejected until activation has completed.

use thiserror::Error;

use pwakit_cache::CacheError;
use pwakit_common::PwakitError;
use pwakit_router::RouterError;

pub mod config;
pub mod lifecycle;

pub use config::{parse_control_message, ControlMessage, WorkerConfig};
pub use lifecycle::{Registration, ServiceWorker, WorkerState};

// Re-exported so embedders set up logging the same way the rest of the
// toolkit does.
pub use pwakit_common::{init_logging, LogConfig, LogFormat};

/// Errors that can occur in worker lifecycle and fetch handling.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// A static manifest entry was unreachable during install. Fatal to this
    /// worker version; no partial cache is committed.
    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Routing error: {0}")]
    Routing(#[from] RouterError),
}

impl From<WorkerError> for PwakitError {
    fn from(err: WorkerError) -> Self {
        match &err {
            WorkerError::InstallFailed(_) | WorkerError::State(_) => {
                PwakitError::lifecycle(err.to_string())
            }
            WorkerError::Config(_) => PwakitError::config(err.to_string()),
            WorkerError::Cache(_) => PwakitError::cache(err.to_string()),
            WorkerError::Routing(_) => PwakitError::network(err.to_string()),
        }
    }
}
