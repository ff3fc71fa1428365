//! Worker lifecycle: install, activate, fetch, and version management.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pwakit_cache::{CacheNames, CacheStore};
use pwakit_router::{CacheRouter, FetchRequest, Fetcher, Routed};

use crate::config::{parse_control_message, ControlMessage, WorkerConfig};
use crate::WorkerError;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Created, not yet installing.
    #[default]
    Parsed,
    /// Populating the static partition.
    Installing,
    /// Installed, waiting for activation.
    Installed,
    /// Purging stale-generation partitions.
    Activating,
    /// Routing fetches.
    Activated,
    /// Replaced or install failed.
    Redundant,
}

impl WorkerState {
    /// State name for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

/// One worker version: a two-phase populate-then-activate machine around the
/// cache router.
pub struct ServiceWorker {
    config: WorkerConfig,
    names: CacheNames,
    state: WorkerState,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    router: CacheRouter,
}

impl ServiceWorker {
    /// Create a worker version over an injected store and fetcher.
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, WorkerError> {
        config.validate()?;
        let names = config.cache_names();
        let router = CacheRouter::new(config.router_config(), store.clone(), fetcher.clone());
        Ok(Self {
            config,
            names,
            state: WorkerState::Parsed,
            store,
            fetcher,
            router,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// The cache generation this version owns.
    pub fn generation(&self) -> &str {
        self.names.generation()
    }

    /// Check if this version is routing fetches.
    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Activated
    }

    /// Check if this version has been discarded.
    pub fn is_redundant(&self) -> bool {
        self.state == WorkerState::Redundant
    }

    /// Install this version: fetch every static manifest entry and commit
    /// them into the static partition.
    ///
    /// All-or-nothing: every asset is fetched before any is committed. A
    /// single unreachable asset aborts the install and discards this
    /// version; no retry is performed.
    pub async fn install(&mut self) -> Result<(), WorkerError> {
        if self.state != WorkerState::Parsed {
            return Err(WorkerError::State(format!(
                "install from state {}",
                self.state.as_str()
            )));
        }
        self.state = WorkerState::Installing;
        info!(
            generation = self.generation(),
            assets = self.config.static_manifest.len(),
            "installing worker"
        );

        match self.populate_static().await {
            Ok(()) => {
                self.state = WorkerState::Installed;
                info!(generation = self.generation(), "worker installed, waiting");
                Ok(())
            }
            Err(err) => {
                warn!(generation = self.generation(), error = %err, "install failed, discarding worker version");
                self.state = WorkerState::Redundant;
                Err(err)
            }
        }
    }

    async fn populate_static(&self) -> Result<(), WorkerError> {
        let mut entries = Vec::with_capacity(self.config.static_manifest.len());
        for path in &self.config.static_manifest {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|e| WorkerError::InstallFailed(format!("{}: {}", path, e)))?;
            let request = FetchRequest::get(url);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| WorkerError::InstallFailed(format!("{}: {}", path, e)))?;
            if !response.is_success() {
                return Err(WorkerError::InstallFailed(format!(
                    "{}: status {}",
                    path, response.status
                )));
            }
            entries.push(response.to_entry(&request));
        }

        // Every asset resolved; only now is anything committed.
        let static_partition = self.names.static_partition();
        self.store.open(&static_partition).await?;
        self.store.open(&self.names.dynamic_partition()).await?;
        for entry in entries {
            self.store.put(&static_partition, entry).await?;
        }
        Ok(())
    }

    /// Activate this version: purge every partition the current generation
    /// does not own, then begin accepting fetches.
    pub async fn activate(&mut self) -> Result<(), WorkerError> {
        if self.state != WorkerState::Installed {
            return Err(WorkerError::State(format!(
                "activate from state {}",
                self.state.as_str()
            )));
        }
        self.state = WorkerState::Activating;

        for partition in self.store.partition_names().await {
            if !self.names.owns(&partition) {
                self.store.delete(&partition).await?;
                info!(partition = %partition, "purged stale cache partition");
            }
        }

        self.state = WorkerState::Activated;
        info!(generation = self.generation(), "worker activated");
        Ok(())
    }

    /// Route one intercepted request.
    ///
    /// Fetch handling never begins before activation completes; routing a
    /// fetch to a non-activated worker is a state error.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<Routed, WorkerError> {
        if self.state != WorkerState::Activated {
            return Err(WorkerError::State(format!(
                "fetch before activation (state {})",
                self.state.as_str()
            )));
        }
        Ok(self.router.route(request).await?)
    }

    fn retire(&mut self) {
        self.state = WorkerState::Redundant;
    }
}

/// Version management: at most one waiting and one active worker.
///
/// A failed install leaves the previous active version serving; activation
/// of the waiting version retires the old one.
#[derive(Default)]
pub struct Registration {
    waiting: Option<ServiceWorker>,
    active: Option<ServiceWorker>,
}

impl Registration {
    /// Create an empty registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The waiting (installed) version, if any.
    pub fn waiting(&self) -> Option<&ServiceWorker> {
        self.waiting.as_ref()
    }

    /// The active version, if any.
    pub fn active(&self) -> Option<&ServiceWorker> {
        self.active.as_ref()
    }

    /// Install a new worker version. On success it parks in `waiting`; on
    /// failure the previous active version keeps serving.
    pub async fn install(&mut self, mut worker: ServiceWorker) -> Result<(), WorkerError> {
        worker.install().await?;
        if self.waiting.is_some() {
            debug!("replacing previously waiting worker version");
        }
        self.waiting = Some(worker);
        Ok(())
    }

    /// Activate the waiting version, retiring the old active one.
    pub async fn activate_waiting(&mut self) -> Result<(), WorkerError> {
        let mut worker = self
            .waiting
            .take()
            .ok_or_else(|| WorkerError::State("no waiting worker".to_string()))?;

        match worker.activate().await {
            Ok(()) => {
                if let Some(mut old) = self.active.take() {
                    old.retire();
                }
                self.active = Some(worker);
                Ok(())
            }
            Err(err) => {
                worker.retire();
                Err(err)
            }
        }
    }

    /// Handle a page control message. `SKIP_WAITING` forces the waiting
    /// version into activation; anything unrecognized is ignored.
    pub async fn handle_message(&mut self, raw: &str) -> Result<(), WorkerError> {
        match parse_control_message(raw) {
            Some(ControlMessage::SkipWaiting) => {
                if self.waiting.is_some() {
                    info!("skip-waiting requested, activating waiting worker");
                    self.activate_waiting().await
                } else {
                    debug!("skip-waiting with no waiting worker, ignoring");
                    Ok(())
                }
            }
            None => {
                debug!("ignoring unrecognized control message");
                Ok(())
            }
        }
    }

    /// Route a fetch through the active version.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<Routed, WorkerError> {
        match &self.active {
            Some(worker) => worker.handle_fetch(request).await,
            None => Err(WorkerError::State("no active worker".to_string())),
        }
    }
}
