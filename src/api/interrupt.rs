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

//! Cooperative query interruption
//!
//! Every query started through a connection draws a fresh generation number
//! from the connection's [`InterruptToken`]. `interrupt()` records the
//! current generation as interrupted, and a running query with generation
//! `g` stops at its next poll iff the interrupted generation is `>= g`.
//! Queries started after the interrupt draw a larger generation and are not
//! affected by it.
//!
//! Polling is lock-free. The in-flight counter sits behind a mutex only so
//! that `close()` can wait for it to drain.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::core::{Error, Result};
use crate::executor::CancellationProbe;
use crate::storage::traits::InterruptHook;

/// How a query guarded by a [`QueryGuard`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Completed,
    Interrupted,
    Failed,
}

/// Counters reported by [`InterruptToken::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStats {
    /// Queries started
    pub started: u64,
    pub completed: u64,
    pub interrupted: u64,
    pub failed: u64,
    /// Queries currently running
    pub in_flight: usize,
}

struct TokenState {
    generation: AtomicU64,
    interrupted: AtomicU64,
    closing: AtomicBool,
    in_flight: Mutex<usize>,
    idle: Condvar,
    hook: Mutex<Option<InterruptHook>>,
    completed: AtomicU64,
    interrupted_queries: AtomicU64,
    failed: AtomicU64,
}

impl TokenState {
    fn fire_hook(&self) {
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

/// Per-connection cancellation flag with a generation counter
///
/// Cloning yields another handle to the same token.
#[derive(Clone)]
pub struct InterruptToken {
    state: Arc<TokenState>,
}

impl Default for InterruptToken {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptToken {
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState {
                generation: AtomicU64::new(0),
                interrupted: AtomicU64::new(0),
                closing: AtomicBool::new(false),
                in_flight: Mutex::new(0),
                idle: Condvar::new(),
                hook: Mutex::new(None),
                completed: AtomicU64::new(0),
                interrupted_queries: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    /// Install the engine's native interrupt hook
    pub fn set_hook(&self, hook: Option<InterruptHook>) {
        *self.state.hook.lock() = hook;
    }

    /// Register a starting query
    ///
    /// Fails with `ConnectionClosed` once the token is closing.
    pub fn begin_query(&self) -> Result<QueryGuard> {
        let mut in_flight = self.state.in_flight.lock();
        if self.state.closing.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        *in_flight += 1;
        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(QueryGuard {
            state: Arc::clone(&self.state),
            generation,
            finished: false,
        })
    }

    /// Interrupt every query currently running
    ///
    /// A no-op when nothing is running. Fails with `ConnectionClosed` once
    /// the token is closing.
    pub fn interrupt(&self) -> Result<()> {
        if self.state.closing.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        let current = self.state.generation.load(Ordering::Acquire);
        self.state.interrupted.fetch_max(current, Ordering::AcqRel);
        if self.is_running() {
            tracing::debug!(generation = current, "interrupt requested");
            self.state.fire_hook();
        }
        Ok(())
    }

    /// Enter the terminal closing state
    ///
    /// Every probe reports `Interrupted` from now on and new queries are
    /// refused. Returns false if the token was already closing.
    pub fn close(&self) -> bool {
        if self.state.closing.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.is_running() {
            self.state.fire_hook();
        }
        true
    }

    pub fn is_closing(&self) -> bool {
        self.state.closing.load(Ordering::Acquire)
    }

    /// Block until no query is running
    pub fn wait_idle(&self) {
        let mut in_flight = self.state.in_flight.lock();
        while *in_flight > 0 {
            self.state.idle.wait(&mut in_flight);
        }
    }

    pub fn is_running(&self) -> bool {
        *self.state.in_flight.lock() > 0
    }

    /// Generation handed to the most recently started query
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> InterruptStats {
        InterruptStats {
            started: self.state.generation.load(Ordering::Acquire),
            completed: self.state.completed.load(Ordering::Relaxed),
            interrupted: self.state.interrupted_queries.load(Ordering::Relaxed),
            failed: self.state.failed.load(Ordering::Relaxed),
            in_flight: *self.state.in_flight.lock(),
        }
    }
}

impl fmt::Debug for InterruptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptToken")
            .field("generation", &self.generation())
            .field("interrupted", &self.state.interrupted.load(Ordering::Relaxed))
            .field("closing", &self.is_closing())
            .finish()
    }
}

/// RAII registration of one running query
///
/// Dropping the guard decrements the in-flight counter. A guard dropped
/// without [`finish`](QueryGuard::finish) counts as failed.
pub struct QueryGuard {
    state: Arc<TokenState>,
    generation: u64,
    finished: bool,
}

impl QueryGuard {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Probe handed to the engine through the execution context
    pub fn probe(&self) -> Arc<dyn CancellationProbe> {
        Arc::new(GenerationProbe {
            state: Arc::clone(&self.state),
            generation: self.generation,
        })
    }

    /// Record how the query ended
    pub fn finish<T>(mut self, result: &Result<T>) -> QueryOutcome {
        let outcome = match result {
            Ok(_) => QueryOutcome::Completed,
            Err(e) if e.is_interrupted() => QueryOutcome::Interrupted,
            Err(_) => QueryOutcome::Failed,
        };
        self.record(outcome);
        outcome
    }

    fn record(&mut self, outcome: QueryOutcome) {
        self.finished = true;
        let counter = match outcome {
            QueryOutcome::Completed => &self.state.completed,
            QueryOutcome::Interrupted => &self.state.interrupted_queries,
            QueryOutcome::Failed => &self.state.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.record(QueryOutcome::Failed);
        }
        let mut in_flight = self.state.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.state.idle.notify_all();
        }
    }
}

struct GenerationProbe {
    state: Arc<TokenState>,
    generation: u64,
}

impl CancellationProbe for GenerationProbe {
    fn check_cancelled(&self) -> Result<()> {
        if self.state.closing.load(Ordering::Acquire)
            || self.state.interrupted.load(Ordering::Acquire) >= self.generation
        {
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_interrupt_cancels_running_query() {
        let token = InterruptToken::new();
        let guard = token.begin_query().unwrap();
        let probe = guard.probe();
        assert!(probe.check_cancelled().is_ok());

        token.interrupt().unwrap();
        assert_eq!(probe.check_cancelled(), Err(Error::Interrupted));
        assert_eq!(
            guard.finish(&Err::<(), _>(Error::Interrupted)),
            QueryOutcome::Interrupted
        );
        assert_eq!(token.stats().interrupted, 1);
    }

    #[test]
    fn test_stale_interrupt_does_not_leak() {
        let token = InterruptToken::new();
        // Idle interrupt is a no-op
        token.interrupt().unwrap();
        let guard = token.begin_query().unwrap();
        assert!(guard.probe().check_cancelled().is_ok());
        guard.finish(&Ok(()));

        let first = token.begin_query().unwrap();
        token.interrupt().unwrap();
        first.finish(&Err::<(), _>(Error::Interrupted));

        let second = token.begin_query().unwrap();
        assert!(second.generation() > token.state.interrupted.load(Ordering::Acquire));
        assert!(second.probe().check_cancelled().is_ok());
        drop(second);

        let stats = token.stats();
        assert_eq!(stats.started, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.interrupted, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[test]
    fn test_interrupt_covers_concurrent_queries() {
        let token = InterruptToken::new();
        let a = token.begin_query().unwrap();
        let b = token.begin_query().unwrap();
        token.interrupt().unwrap();
        assert!(a.probe().check_cancelled().is_err());
        assert!(b.probe().check_cancelled().is_err());
    }

    #[test]
    fn test_close_refuses_and_cancels() {
        let token = InterruptToken::new();
        let guard = token.begin_query().unwrap();
        let probe = guard.probe();
        assert!(token.close());
        assert!(!token.close());
        assert!(probe.check_cancelled().is_err());
        assert!(matches!(token.begin_query(), Err(Error::ConnectionClosed)));
        assert_eq!(token.interrupt(), Err(Error::ConnectionClosed));
        drop(guard);
        token.wait_idle();
    }

    #[test]
    fn test_hook_fires_only_when_running() {
        let token = InterruptToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        token.set_hook(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        token.interrupt().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let _guard = token.begin_query().unwrap();
        token.interrupt().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_idle_blocks_until_drained() {
        let token = InterruptToken::new();
        let guard = token.begin_query().unwrap();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || {
                token.close();
                token.wait_idle();
                token.is_running()
            })
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        drop(guard);
        assert!(!waiter.join().unwrap());
    }
}
