// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Instance registry
//!
//! Caches one engine per storage [`Location`] and hands out reference
//! counted [`EngineLease`]s. The map lock is only held for bookkeeping:
//! engines are constructed and closed outside of it. While an engine is
//! being constructed or closed its entry holds a construction slot, and
//! requests for the same location wait on that slot and then look again.
//!
//! # Example
//!
//! ```ignore
//! use stoolap_client::{Config, InstanceRegistry, MemoryEngineFactory};
//!
//! let registry = InstanceRegistry::new(Arc::new(MemoryEngineFactory));
//! let a = registry.connect("file:///tmp/app.db", Config::default())?;
//! let b = registry.connect("/tmp/./app.db", Config::default())?;
//! assert_eq!(registry.instance_count(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use super::connection::Connection;
use super::identity::{IntoTarget, Location, Target};
use crate::core::{Error, Result};
use crate::storage::{Config, ConfigFingerprint, Engine, EngineFactory, MemoryEngineFactory};

/// Process-wide registry used by [`connect`]
static GLOBAL_REGISTRY: LazyLock<Arc<InstanceRegistry>> =
    LazyLock::new(|| Arc::new(InstanceRegistry::new(Arc::new(MemoryEngineFactory))));

/// Open a connection through the process-wide registry
pub fn connect(target: impl IntoTarget, config: Config) -> Result<Connection> {
    InstanceRegistry::global().connect(target, config)
}

/// Marks an entry whose engine is being built or torn down
struct ConstructionSlot {
    done: Mutex<bool>,
    cond: Condvar,
}

impl ConstructionSlot {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    fn complete(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }
}

struct Instance {
    engine: Arc<dyn Engine>,
    config: Config,
    fingerprint: ConfigFingerprint,
    refs: usize,
}

enum Slot {
    Building(Arc<ConstructionSlot>),
    Ready(Instance),
}

/// Removes a construction slot and wakes waiters unless disarmed.
/// Covers both a failed factory call and a panicking one.
struct PendingBuild<'a> {
    registry: &'a InstanceRegistry,
    location: &'a Location,
    slot: &'a ConstructionSlot,
    armed: bool,
}

impl Drop for PendingBuild<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.instances.lock().remove(self.location);
            self.slot.complete();
        }
    }
}

/// Cache of open engines keyed by storage location
pub struct InstanceRegistry {
    factory: Arc<dyn EngineFactory>,
    instances: Mutex<FxHashMap<Location, Slot>>,
    next_anonymous: AtomicU64,
    default_connection: Mutex<Option<Connection>>,
}

impl InstanceRegistry {
    /// Create an empty registry that opens engines with `factory`
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            instances: Mutex::new(FxHashMap::default()),
            next_anonymous: AtomicU64::new(1),
            default_connection: Mutex::new(None),
        }
    }

    /// The lazily created process-wide registry
    pub fn global() -> &'static Arc<InstanceRegistry> {
        &GLOBAL_REGISTRY
    }

    /// Open a connection to `target`
    pub fn connect(self: &Arc<Self>, target: impl IntoTarget, config: Config) -> Result<Connection> {
        match target.into_target() {
            Target::Default => self.default_connection(config),
            target => {
                let location =
                    target.resolve(|| self.next_anonymous.fetch_add(1, Ordering::Relaxed))?;
                Connection::open(self, location, config)
            }
        }
    }

    /// Return the registry-wide default connection, creating it if needed
    pub fn default_connection(self: &Arc<Self>, config: Config) -> Result<Connection> {
        if !config.is_default() {
            return Err(Error::configuration(
                "Default connection fetching is only allowed without additional options",
            ));
        }
        let mut slot = self.default_connection.lock();
        if let Some(conn) = slot.as_ref() {
            if !conn.is_closed() {
                return Ok(conn.clone());
            }
        }
        let conn = Connection::open(self, Location::Default, config)?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Close and forget the default connection
    pub fn close_default(&self) -> Result<()> {
        let conn = self.default_connection.lock().take();
        match conn {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }

    /// Take a lease on the engine for `location`, constructing it on a miss
    pub fn acquire(self: &Arc<Self>, location: Location, config: &Config) -> Result<EngineLease> {
        config.validate_settings(self.factory.recognized_settings())?;
        if config.read_only && location.is_in_memory() {
            return Err(Error::configuration(
                "Cannot launch in-memory database in read-only mode",
            ));
        }
        let fingerprint = config.fingerprint();

        loop {
            let slot = {
                let mut instances = self.instances.lock();
                match instances.get_mut(&location) {
                    Some(Slot::Ready(instance)) => {
                        if instance.fingerprint != fingerprint {
                            return Err(Error::configuration(
                                "Can't open a connection to same database file with a different configuration than existing connections",
                            ));
                        }
                        instance.refs += 1;
                        return Ok(EngineLease::new(
                            Arc::clone(self),
                            location,
                            Arc::clone(&instance.engine),
                            instance.config.clone(),
                        ));
                    }
                    Some(Slot::Building(slot)) => Arc::clone(slot),
                    None => {
                        let slot = Arc::new(ConstructionSlot::new());
                        instances.insert(location.clone(), Slot::Building(Arc::clone(&slot)));
                        drop(instances);
                        return self.build(location, config, fingerprint, &slot);
                    }
                }
            };
            slot.wait();
        }
    }

    fn build(
        self: &Arc<Self>,
        location: Location,
        config: &Config,
        fingerprint: ConfigFingerprint,
        slot: &ConstructionSlot,
    ) -> Result<EngineLease> {
        let mut pending = PendingBuild {
            registry: self,
            location: &location,
            slot,
            armed: true,
        };
        let engine = self.factory.create(&location, config)?;
        self.instances.lock().insert(
            location.clone(),
            Slot::Ready(Instance {
                engine: Arc::clone(&engine),
                config: config.clone(),
                fingerprint,
                refs: 1,
            }),
        );
        pending.armed = false;
        drop(pending);
        slot.complete();
        tracing::debug!(%location, "engine instance created");
        Ok(EngineLease::new(
            Arc::clone(self),
            location,
            engine,
            config.clone(),
        ))
    }

    /// Take another lease on an engine that is already leased
    fn retain(self: &Arc<Self>, location: &Location) -> Result<EngineLease> {
        let mut instances = self.instances.lock();
        match instances.get_mut(location) {
            Some(Slot::Ready(instance)) => {
                instance.refs += 1;
                Ok(EngineLease::new(
                    Arc::clone(self),
                    location.clone(),
                    Arc::clone(&instance.engine),
                    instance.config.clone(),
                ))
            }
            _ => Err(Error::internal(format!(
                "no live engine instance for {}",
                location
            ))),
        }
    }

    /// Drop one reference; the last one closes the engine
    fn release(&self, location: &Location) -> Result<()> {
        let slot = Arc::new(ConstructionSlot::new());
        let engine = {
            let mut instances = self.instances.lock();
            let engine = match instances.remove(location) {
                Some(Slot::Ready(mut instance)) => {
                    instance.refs -= 1;
                    if instance.refs > 0 {
                        instances.insert(location.clone(), Slot::Ready(instance));
                        return Ok(());
                    }
                    instance.engine
                }
                Some(building) => {
                    instances.insert(location.clone(), building);
                    return Err(Error::internal(format!(
                        "release of {} while it is being constructed",
                        location
                    )));
                }
                None => {
                    return Err(Error::internal(format!(
                        "release of unknown instance {}",
                        location
                    )))
                }
            };
            instances.insert(location.clone(), Slot::Building(Arc::clone(&slot)));
            engine
        };

        let result = engine.close();
        self.instances.lock().remove(location);
        slot.complete();
        match &result {
            Ok(()) => tracing::debug!(%location, "engine instance closed"),
            Err(e) => tracing::warn!(%location, error = %e, "engine close failed"),
        }
        result
    }

    /// Number of engines currently open
    pub fn instance_count(&self) -> usize {
        self.instances
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// Number of leases held on the engine for `location`
    pub fn ref_count(&self, location: &Location) -> usize {
        match self.instances.lock().get(location) {
            Some(Slot::Ready(instance)) => instance.refs,
            _ => 0,
        }
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.instance_count())
            .finish()
    }
}

/// One counted reference to a cached engine
///
/// Released exactly once, by [`EngineLease::release`] or on drop.
pub struct EngineLease {
    registry: Arc<InstanceRegistry>,
    location: Location,
    engine: Arc<dyn Engine>,
    config: Config,
    released: AtomicBool,
}

impl EngineLease {
    fn new(
        registry: Arc<InstanceRegistry>,
        location: Location,
        engine: Arc<dyn Engine>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            location,
            engine,
            config,
            released: AtomicBool::new(false),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Configuration the engine instance was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// A new lease on the same engine
    pub fn duplicate(&self) -> Result<EngineLease> {
        if self.is_released() {
            return Err(Error::ConnectionClosed);
        }
        self.registry.retain(&self.location)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Give the reference back; later calls are no-ops
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.registry.release(&self.location)
    }
}

impl fmt::Debug for EngineLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLease")
            .field("location", &self.location)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(location = %self.location, error = %e, "failed to release engine lease");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<InstanceRegistry> {
        Arc::new(InstanceRegistry::new(Arc::new(MemoryEngineFactory)))
    }

    #[test]
    fn test_acquire_shares_and_releases() {
        let registry = registry();
        let location = Location::Memory("shared".to_string());
        let a = registry.acquire(location.clone(), &Config::default()).unwrap();
        let b = registry.acquire(location.clone(), &Config::default()).unwrap();
        assert!(Arc::ptr_eq(a.engine(), b.engine()));
        assert_eq!(registry.ref_count(&location), 2);

        a.release().unwrap();
        a.release().unwrap();
        assert_eq!(registry.ref_count(&location), 1);
        drop(b);
        assert_eq!(registry.ref_count(&location), 0);
        assert_eq!(registry.instance_count(), 0);
    }

    #[test]
    fn test_incompatible_config_rejected() {
        let registry = registry();
        let location = Location::Memory("cfg".to_string());
        let _lease = registry
            .acquire(location.clone(), &Config::new().with_setting("default_order", "desc"))
            .unwrap();
        let err = registry
            .acquire(location.clone(), &Config::default())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        // threads may differ; the existing instance's value wins
        let lease = registry
            .acquire(
                location,
                &Config::new()
                    .with_setting("default_order", "desc")
                    .with_threads(64),
            )
            .unwrap();
        assert_eq!(lease.config().threads, None);
    }

    #[test]
    fn test_read_only_memory_rejected() {
        let registry = registry();
        let err = registry
            .acquire(Location::Anonymous(1), &Config::new().with_read_only(true))
            .unwrap_err();
        assert_eq!(
            err,
            Error::configuration("Cannot launch in-memory database in read-only mode")
        );
        assert_eq!(registry.instance_count(), 0);
    }

    #[test]
    fn test_failed_construction_leaves_no_entry() {
        let registry = registry();
        let location = Location::Memory("bad".to_string());
        let err = registry
            .acquire(location.clone(), &Config::new().with_setting("max_rows", "lots"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(registry.ref_count(&location), 0);
        assert!(registry.acquire(location, &Config::default()).is_ok());
    }

    #[test]
    fn test_lease_duplicate() {
        let registry = registry();
        let location = Location::Memory("dup".to_string());
        let lease = registry.acquire(location.clone(), &Config::default()).unwrap();
        let copy = lease.duplicate().unwrap();
        assert_eq!(registry.ref_count(&location), 2);
        lease.release().unwrap();
        assert!(matches!(lease.duplicate(), Err(Error::ConnectionClosed)));
        drop(copy);
        assert_eq!(registry.instance_count(), 0);
    }
}
