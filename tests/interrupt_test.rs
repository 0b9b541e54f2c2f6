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

//! Interrupt Tests
//!
//! A long-running table function stands in for a slow query: it signals
//! once it produced its first row and then never ends on its own.

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use common::{counting_registry, memory_registry, CountingFactory};
use stoolap_client::{
    Config, Connection, DataType, Error, TableFunction, TableFunctionKind, TableOutput, Value,
};

/// Register `endless()`, which reports on `started` when its first row is pulled
fn register_endless(conn: &Connection) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel();
    let function = TableFunction::new(
        "endless",
        vec![("n", DataType::Integer)],
        TableFunctionKind::Tuples,
        move |_| {
            let started = tx.clone();
            let mut n = 0i64;
            Ok(TableOutput::rows(std::iter::from_fn(move || {
                if n == 0 {
                    let _ = started.send(());
                }
                n += 1;
                Some(vec![Value::Integer(n)])
            })))
        },
    )
    .expect("table function");
    conn.register_table_function(function)
        .expect("register endless");
    rx
}

/// Deadline for a running query to stop after interrupt or close
const STOP_DEADLINE: Duration = Duration::from_secs(5);

/// `SELECT count(*) FROM endless()` running on its own thread
struct EndlessQuery {
    outcome: mpsc::Receiver<stoolap_client::Result<i64>>,
    handle: thread::JoinHandle<()>,
}

impl EndlessQuery {
    /// Wait for the query to end, failing the test past [`STOP_DEADLINE`]
    fn outcome(self) -> stoolap_client::Result<i64> {
        let result = self
            .outcome
            .recv_timeout(STOP_DEADLINE)
            .expect("query did not stop before the deadline");
        self.handle.join().expect("worker panicked");
        result
    }
}

fn spawn_endless_query(conn: &Connection) -> EndlessQuery {
    let conn = conn.clone();
    let (tx, outcome) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(conn.query_one::<i64, _>("SELECT count(*) FROM endless()", ()));
    });
    EndlessQuery { outcome, handle }
}

#[test]
fn test_interrupt_running_query() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:", Config::default()).expect("connect");
    let started = register_endless(&conn);

    let worker = spawn_endless_query(&conn);
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("query never started");
    conn.interrupt().expect("interrupt");

    let result = worker.outcome();
    assert_eq!(result.unwrap_err(), Error::Interrupted);

    // The connection stays usable
    let one: i64 = conn.query_one("SELECT 1", ()).expect("after interrupt");
    assert_eq!(one, 1);

    let stats = conn.interrupt_stats();
    assert_eq!(stats.interrupted, 1);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn test_interrupt_from_cursor() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:", Config::default()).expect("connect");
    let started = register_endless(&conn);
    let cur = conn.cursor().expect("cursor");

    let worker = spawn_endless_query(&conn);
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("query never started");
    cur.interrupt().expect("interrupt through cursor");
    assert!(worker.outcome().unwrap_err().is_interrupted());
}

#[test]
fn test_idle_interrupt_is_a_no_op() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:", Config::default()).expect("connect");

    conn.interrupt().expect("idle interrupt");
    conn.interrupt().expect("repeated idle interrupt");

    let count: i64 = conn
        .query_one("SELECT count(*) FROM range(5000)", ())
        .expect("later query is unaffected");
    assert_eq!(count, 5000);
    assert_eq!(conn.interrupt_stats().interrupted, 0);
}

#[test]
fn test_interrupt_only_hits_current_query() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:", Config::default()).expect("connect");
    let started = register_endless(&conn);

    let worker = spawn_endless_query(&conn);
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("query never started");
    conn.interrupt().expect("interrupt");
    assert!(worker.outcome().is_err());

    for _ in 0..3 {
        let count: i64 = conn
            .query_one("SELECT count(*) FROM range(2048)", ())
            .expect("stale interrupt must not leak");
        assert_eq!(count, 2048);
    }
}

#[test]
fn test_interrupt_does_not_cross_connections() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:cross", Config::default()).expect("connect");
    let other = registry.connect(":memory:cross", Config::default()).expect("other");
    let started = register_endless(&conn);

    let worker = spawn_endless_query(&conn);
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("query never started");
    other.interrupt().expect("interrupt other");

    let count: i64 = other
        .query_one("SELECT count(*) FROM range(10)", ())
        .expect("other connection works");
    assert_eq!(count, 10);

    conn.interrupt().expect("interrupt owner");
    assert!(worker.outcome().unwrap_err().is_interrupted());
}

#[test]
fn test_close_during_query() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:", Config::default()).expect("connect");
    let started = register_endless(&conn);

    let worker = spawn_endless_query(&conn);
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("query never started");

    conn.close().expect("close waits for the query to stop");
    let result = worker.outcome();
    assert_eq!(result.unwrap_err(), Error::Interrupted);
    assert!(conn.is_closed());
    assert_eq!(registry.instance_count(), 0);
}

#[test]
fn test_engine_hook_fires_for_running_query() {
    let (registry, factory) = counting_registry(CountingFactory::default());
    let conn = registry.connect(":memory:", Config::default()).expect("connect");

    conn.interrupt().expect("idle interrupt");
    assert_eq!(factory.hooks_fired(), 0, "No hook without a running query");

    let started = register_endless(&conn);
    let worker = spawn_endless_query(&conn);
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("query never started");
    conn.interrupt().expect("interrupt");
    assert!(worker.outcome().is_err());
    assert_eq!(factory.hooks_fired(), 1);
}
