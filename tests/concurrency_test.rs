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

//! Concurrency Tests
//!
//! Registry and session behavior under contention.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{counting_registry, memory_registry, CountingFactory};
use proptest::prelude::*;
use stoolap_client::{Config, DataType, Error, Location, Value};

#[test]
fn test_concurrent_registration_has_one_winner() {
    let registry = memory_registry();
    let conn = registry.connect(":memory:", Config::default()).expect("connect");
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let conn = conn.clone();
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                barrier.wait();
                let result = conn.create_function(
                    "contested",
                    vec![],
                    DataType::Integer,
                    move |_| Ok(Value::Integer(i as i64)),
                );
                match result {
                    Ok(()) => {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => assert!(matches!(e, Error::FunctionRegistration(_))),
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    let value: i64 = conn.query_one("SELECT contested()", ()).expect("call");
    assert!((0..threads as i64).contains(&value));
}

#[test]
fn test_connect_close_churn() {
    let (registry, factory) = counting_registry(CountingFactory::default());
    let threads = 6;
    let rounds = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    let conn = registry
                        .connect(":memory:churn", Config::default())
                        .expect("connect");
                    let one: i64 = conn.query_one("SELECT 1", ()).expect("select");
                    assert_eq!(one, 1);
                    conn.close().expect("close");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(registry.instance_count(), 0);
    assert_eq!(
        factory.created(),
        factory.closed(),
        "Every constructed engine is closed exactly once"
    );
}

#[test]
fn test_file_connect_close_churn() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("churn.db");
    let path = path.to_str().expect("utf-8 path").to_string();
    let (registry, factory) = counting_registry(CountingFactory::default());
    let threads = 50;
    let rounds = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    let conn = registry
                        .connect(path.as_str(), Config::default())
                        .expect("connect");
                    let location = conn.identity().location().clone();
                    assert!(registry.ref_count(&location) >= 1);
                    conn.close().expect("close");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let conn = registry.connect(path.as_str(), Config::default()).expect("connect");
    let location = conn.identity().location().clone();
    conn.close().expect("close");
    assert_eq!(registry.ref_count(&location), 0);
    assert_eq!(registry.instance_count(), 0);
    assert_eq!(factory.created(), factory.closed());
}

#[test]
fn test_begin_racing_close_leaves_no_transaction() {
    let (registry, factory) = counting_registry(CountingFactory::default());
    let keeper = registry
        .connect(":memory:racing", Config::default())
        .expect("keeper");

    for _ in 0..200 {
        let conn = registry
            .connect(":memory:racing", Config::default())
            .expect("connect");
        let barrier = Arc::new(Barrier::new(2));
        let starter = {
            let conn = conn.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                match conn.begin() {
                    Ok(()) | Err(Error::ConnectionClosed) => {}
                    Err(e) => panic!("unexpected begin error: {}", e),
                }
            })
        };
        barrier.wait();
        conn.close().expect("close");
        starter.join().expect("thread panicked");
        assert_eq!(factory.open_transactions(), 0);
    }

    keeper.close().expect("close keeper");
    assert_eq!(registry.instance_count(), 0);
}

#[test]
fn test_parallel_writers_on_shared_database() {
    let registry = memory_registry();
    let setup = registry.connect(":memory:writers", Config::default()).expect("setup");
    setup
        .execute("CREATE TABLE events (id INTEGER, source INTEGER)", ())
        .expect("create");

    let handles: Vec<_> = (0..4i64)
        .map(|source| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let conn = registry
                    .connect(":memory:writers", Config::default())
                    .expect("connect");
                for id in 0..50i64 {
                    conn.execute("INSERT INTO events VALUES (?, ?)", (id, source))
                        .expect("insert");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let count: i64 = setup
        .query_one("SELECT count(*) FROM events", ())
        .expect("count");
    assert_eq!(count, 200);
}

#[derive(Debug, Clone)]
enum Op {
    Open(u8),
    Duplicate(usize),
    Close(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3).prop_map(Op::Open),
        any::<usize>().prop_map(Op::Duplicate),
        any::<usize>().prop_map(Op::Close),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ref_counts_follow_open_connections(ops in prop::collection::vec(op(), 1..40)) {
        let (registry, factory) = counting_registry(CountingFactory::default());
        let mut open = Vec::new();

        for op in ops {
            match op {
                Op::Open(tag) => {
                    let conn = registry
                        .connect(format!(":memory:db{tag}"), Config::default())
                        .expect("connect");
                    open.push(conn);
                }
                Op::Duplicate(i) if !open.is_empty() => {
                    let dup = open[i % open.len()].duplicate().expect("duplicate");
                    open.push(dup);
                }
                Op::Close(i) if !open.is_empty() => {
                    let conn = open.swap_remove(i % open.len());
                    conn.close().expect("close");
                }
                _ => {}
            }

            for tag in 0..3u8 {
                let location = Location::Memory(format!("db{tag}"));
                let expected = open
                    .iter()
                    .filter(|c| c.identity().location() == &location)
                    .count();
                prop_assert_eq!(registry.ref_count(&location), expected);
            }
            let live = (0..3u8)
                .filter(|tag| {
                    open.iter()
                        .any(|c| c.identity().location() == &Location::Memory(format!("db{tag}")))
                })
                .count();
            prop_assert_eq!(registry.instance_count(), live);
        }

        drop(open);
        prop_assert_eq!(registry.instance_count(), 0);
        prop_assert_eq!(factory.created(), factory.closed());
    }
}
