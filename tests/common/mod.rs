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

//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use stoolap_client::{
    Config, Engine, EngineFactory, Error, ExecutionContext, InstanceRegistry, InterruptHook,
    Location, MemoryEngine, QueryResult, Result, StatementKind, TransactionId, Value,
};

const SETTINGS: &[&str] = &[
    "memory_limit",
    "default_order",
    "max_rows",
    "checkpoint_threshold",
];

/// Factory that counts engine constructions, closes, interrupt hook calls
/// and transactions left open
#[derive(Default)]
pub struct CountingFactory {
    pub created: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub hooks_fired: Arc<AtomicUsize>,
    pub open_transactions: Arc<AtomicIsize>,
    pub fail_next: AtomicBool,
    pub build_delay: Option<Duration>,
}

impl CountingFactory {
    pub fn slow(delay: Duration) -> Self {
        Self {
            build_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn hooks_fired(&self) -> usize {
        self.hooks_fired.load(Ordering::SeqCst)
    }

    pub fn open_transactions(&self) -> isize {
        self.open_transactions.load(Ordering::SeqCst)
    }
}

impl EngineFactory for CountingFactory {
    fn create(&self, location: &Location, config: &Config) -> Result<Arc<dyn Engine>> {
        if let Some(delay) = self.build_delay {
            thread::sleep(delay);
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::io("injected construction failure"));
        }
        let inner = MemoryEngine::open(location.clone(), config.clone())?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(CountingEngine {
            inner,
            closed: Arc::clone(&self.closed),
            hooks_fired: Arc::clone(&self.hooks_fired),
            open_transactions: Arc::clone(&self.open_transactions),
        }))
    }

    fn recognized_settings(&self) -> &[&'static str] {
        SETTINGS
    }
}

struct CountingEngine {
    inner: MemoryEngine,
    closed: Arc<AtomicUsize>,
    hooks_fired: Arc<AtomicUsize>,
    open_transactions: Arc<AtomicIsize>,
}

impl Engine for CountingEngine {
    fn run(&self, ctx: &ExecutionContext, sql: &str) -> Result<Box<dyn QueryResult>> {
        self.inner.run(ctx, sql)
    }

    fn classify(&self, sql: &str) -> Result<StatementKind> {
        self.inner.classify(sql)
    }

    fn begin_transaction(&self) -> Result<TransactionId> {
        let txn = self.inner.begin_transaction()?;
        self.open_transactions.fetch_add(1, Ordering::SeqCst);
        Ok(txn)
    }

    fn commit(&self, txn: TransactionId) -> Result<()> {
        self.inner.commit(txn)?;
        self.open_transactions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, txn: TransactionId) -> Result<()> {
        self.inner.rollback(txn)?;
        self.open_transactions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn setting(&self, name: &str) -> Option<Value> {
        self.inner.setting(name)
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn interrupt_hook(&self) -> Option<InterruptHook> {
        let fired = Arc::clone(&self.hooks_fired);
        Some(Arc::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

/// Registry backed by the plain in-memory engine
pub fn memory_registry() -> Arc<InstanceRegistry> {
    Arc::new(InstanceRegistry::new(Arc::new(
        stoolap_client::MemoryEngineFactory,
    )))
}

/// Registry backed by a counting factory
pub fn counting_registry(factory: CountingFactory) -> (Arc<InstanceRegistry>, Arc<CountingFactory>) {
    let factory = Arc::new(factory);
    let registry = Arc::new(InstanceRegistry::new(
        Arc::clone(&factory) as Arc<dyn EngineFactory>
    ));
    (registry, factory)
}
