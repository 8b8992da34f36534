//! Engine registry: constructs, caches and health-manages one live engine
//! instance per kind.

use crate::config::OrchestratorConfig;
use crate::error::{OrchestrationError, Result};
use montage_abstraction::{
    EngineConstructor, EngineInfo, EngineKind, EngineStatistics, EngineStatus, VideoEngine,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

struct Registration {
    constructor: EngineConstructor,
    params: serde_json::Value,
}

/// Single source of truth for live engine instances.
///
/// The cache lock is never held across an `.await`; initialization runs
/// outside it.
pub struct EngineRegistry {
    registrations: BTreeMap<EngineKind, Registration>,
    cache: RwLock<HashMap<EngineKind, Arc<dyn VideoEngine>>>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { registrations: BTreeMap::new(), cache: RwLock::new(HashMap::new()) }
    }

    /// Creates a registry from configuration, skipping disabled engines.
    ///
    /// # Arguments
    /// * `config` - Supplies per-engine enablement and parameters
    /// * `constructors` - Available constructors per kind
    pub fn from_config<I>(config: &OrchestratorConfig, constructors: I) -> Self
    where
        I: IntoIterator<Item = (EngineKind, EngineConstructor)>,
    {
        let mut registry = Self::new();
        for (kind, constructor) in constructors {
            if config.is_enabled(kind) {
                registry.register_with_params(kind, constructor, config.engine_params(kind));
            } else {
                debug!(engine = %kind, "Engine disabled by configuration");
            }
        }
        registry
    }

    /// Registers a constructor with no parameters.
    pub fn register(&mut self, kind: EngineKind, constructor: EngineConstructor) {
        self.register_with_params(kind, constructor, serde_json::Value::Null);
    }

    /// Registers a constructor with its configuration blob.
    pub fn register_with_params(
        &mut self,
        kind: EngineKind,
        constructor: EngineConstructor,
        params: serde_json::Value,
    ) {
        self.registrations.insert(kind, Registration { constructor, params });
    }

    /// Kinds with a registered constructor, in declaration order.
    pub fn known_kinds(&self) -> Vec<EngineKind> {
        self.registrations.keys().copied().collect()
    }

    /// The cached instance for `kind`, if any.
    pub fn cached(&self, kind: EngineKind) -> Option<Arc<dyn VideoEngine>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).get(&kind).cloned()
    }

    fn cached_all(&self) -> Vec<Arc<dyn VideoEngine>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let mut engines: Vec<_> = cache.values().cloned().collect();
        engines.sort_by_key(|engine| engine.kind());
        engines
    }

    /// Removes `stale` from the cache unless it has already been replaced.
    /// Returns whether this call removed it.
    fn evict(&self, kind: EngineKind, stale: &Arc<dyn VideoEngine>) -> bool {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.get(&kind).is_some_and(|current| Arc::ptr_eq(current, stale)) {
            cache.remove(&kind);
            true
        } else {
            false
        }
    }

    /// Returns the live engine for `kind`, constructing it if needed.
    ///
    /// A cached engine in `Error` gets exactly one reinitialization. If that
    /// fails it is evicted and replaced by a fresh instance, which is cached
    /// whether or not its own initialization succeeds.
    ///
    /// # Errors
    /// Returns `UnknownEngine` when no constructor is registered, and
    /// `Construction` when the constructor rejects its parameters.
    ///
    /// Concurrent calls on a cold kind may each build an instance; only the
    /// first to reach the cache is kept and the others are shut down.
    pub async fn get_or_create(&self, kind: EngineKind) -> Result<Arc<dyn VideoEngine>> {
        if let Some(engine) = self.cached(kind) {
            if engine.status() != EngineStatus::Error {
                return Ok(engine);
            }
            info!(engine = %kind, "Reinitializing engine in error state");
            if engine.initialize().await {
                return Ok(engine);
            }
            warn!(engine = %kind, "Reinitialization failed, replacing instance");
            if self.evict(kind, &engine) {
                engine.shutdown().await;
            }
        }
        self.construct(kind).await
    }

    async fn construct(&self, kind: EngineKind) -> Result<Arc<dyn VideoEngine>> {
        let registration = self
            .registrations
            .get(&kind)
            .ok_or(OrchestrationError::UnknownEngine(kind))?;
        let engine = (registration.constructor)(&registration.params).map_err(|e| {
            OrchestrationError::Construction { kind, reason: e.to_string() }
        })?;

        let initialized = engine.initialize().await;
        if initialized {
            info!(engine = %kind, "Engine created");
        } else {
            warn!(engine = %kind, "Engine created but failed to initialize");
        }

        let cached = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(kind).or_insert_with(|| Arc::clone(&engine)))
        };
        if !Arc::ptr_eq(&cached, &engine) {
            debug!(engine = %kind, "Lost construction race, shutting down duplicate");
            engine.shutdown().await;
        }
        Ok(cached)
    }

    /// Kinds that can take routed work right now.
    pub async fn list_available(&self) -> Vec<EngineKind> {
        self.list_available_matching(|_| true).await
    }

    /// Kinds that can take routed work right now and satisfy `predicate`.
    ///
    /// Each known kind is created on demand. An offline engine gets one
    /// initialization attempt. Engines that fail to construct, are not
    /// `Idle`/`Busy`, or have no spare capacity are left out.
    pub async fn list_available_matching<F>(&self, predicate: F) -> Vec<EngineKind>
    where
        F: Fn(&EngineInfo) -> bool + Send,
    {
        let mut available = Vec::new();
        for kind in self.known_kinds() {
            let engine = match self.get_or_create(kind).await {
                Ok(engine) => engine,
                Err(e) => {
                    debug!(engine = %kind, error = %e, "Skipping engine that cannot be constructed");
                    continue;
                }
            };
            if engine.status() == EngineStatus::Offline {
                engine.initialize().await;
            }
            let status = engine.status();
            if status.accepts_work() && engine.has_capacity() && predicate(&engine.describe()) {
                available.push(kind);
            } else {
                debug!(engine = %kind, status = %status, running = engine.running_tasks(), "Engine not available");
            }
        }
        available
    }

    /// Runs `test_connection` on every cached engine.
    pub async fn test_all(&self) -> BTreeMap<EngineKind, bool> {
        let mut results = BTreeMap::new();
        for engine in self.cached_all() {
            let ok = engine.test_connection().await;
            results.insert(engine.kind(), ok);
        }
        results
    }

    /// Lifetime counters of every cached engine.
    pub fn engine_statistics(&self) -> BTreeMap<EngineKind, EngineStatistics> {
        self.cached_all().into_iter().map(|engine| (engine.kind(), engine.statistics())).collect()
    }

    /// Clears lifetime counters of every cached engine.
    pub fn reset_engine_statistics(&self) {
        for engine in self.cached_all() {
            engine.state().reset_counters();
        }
    }

    /// Shuts down every cached engine and empties the cache.
    pub async fn shutdown_all(&self) {
        let engines: Vec<_> = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            cache.drain().map(|(_, engine)| engine).collect()
        };
        for engine in engines {
            engine.shutdown().await;
            info!(engine = %engine.kind(), "Engine shut down");
        }
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("known_kinds", &self.known_kinds())
            .finish_non_exhaustive()
    }
}
