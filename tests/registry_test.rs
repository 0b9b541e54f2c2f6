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

//! Instance Registry Tests
//!
//! Engine sharing by location, configuration compatibility, the default
//! connection and construct-once/close-once guarantees.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::{counting_registry, memory_registry, CountingFactory};
use stoolap_client::{Config, Error, Location, Value};

#[test]
fn test_file_spellings_share_one_engine() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("shared.db");
    let (registry, factory) = counting_registry(CountingFactory::default());

    let a = registry
        .connect(path.clone(), Config::default())
        .expect("Failed to connect by path");
    let dsn = format!("file://{}", dir.path().join(".").join("shared.db").display());
    let b = registry
        .connect(dsn.as_str(), Config::default())
        .expect("Failed to connect by DSN");

    assert_eq!(factory.created(), 1, "Engine should be constructed once");
    assert_eq!(a.identity().location(), b.identity().location());
    assert_eq!(registry.ref_count(a.identity().location()), 2);

    // DDL through one connection is visible to the other
    a.execute("CREATE TABLE t (id INTEGER)", ())
        .expect("Failed to create table");
    b.execute("INSERT INTO t VALUES (1)", ())
        .expect("Insert through second connection failed");
    let count: i64 = a
        .query_one("SELECT count(*) FROM t", ())
        .expect("Failed to count");
    assert_eq!(count, 1);

    a.close().expect("close a");
    assert_eq!(factory.closed(), 0, "Engine must outlive remaining connections");
    b.close().expect("close b");
    assert_eq!(factory.closed(), 1, "Engine should be closed exactly once");
    assert_eq!(registry.instance_count(), 0);
}

#[test]
fn test_incompatible_configuration_is_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cfg.db");
    let registry = memory_registry();

    let _writer = registry
        .connect(path.clone(), Config::default())
        .expect("Failed to connect");
    let err = registry
        .connect(path.clone(), Config::new().with_read_only(true))
        .expect_err("read_only mismatch must fail");
    assert_eq!(
        err,
        Error::configuration(
            "Can't open a connection to same database file with a different configuration than existing connections"
        )
    );

    let err = registry
        .connect(path, Config::new().with_setting("default_order", "desc"))
        .expect_err("setting mismatch must fail");
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_threads_option_is_ignored_on_reuse() {
    let registry = memory_registry();
    let first = registry
        .connect(":memory:threads", Config::new().with_threads(2))
        .expect("Failed to connect");
    let second = registry
        .connect(":memory:threads", Config::new().with_threads(16))
        .expect("threads must not conflict");

    let threads: i64 = second
        .query_one("SELECT current_setting('threads')", ())
        .expect("Failed to read setting");
    assert_eq!(threads, 2, "Existing instance's value wins");
    assert_eq!(first.setting("threads").unwrap(), Some(Value::Integer(2)));
}

#[test]
fn test_unrecognized_setting() {
    let registry = memory_registry();
    let err = registry
        .connect(":memory:", Config::new().with_setting("frobnicate", "yes"))
        .expect_err("unknown setting must fail");
    assert_eq!(
        err,
        Error::configuration("Unrecognized configuration property 'frobnicate'")
    );

    let custom = Config::from_options([("custom.app_name", "demo")]).expect("options");
    let conn = registry
        .connect(":memory:", custom)
        .expect("custom settings are accepted");
    assert_eq!(
        conn.setting("custom.app_name").unwrap(),
        Some(Value::text("demo"))
    );
}

#[test]
fn test_read_only_in_memory() {
    let registry = memory_registry();
    for target in [":memory:", ":memory:named", "memory://"] {
        let err = registry
            .connect(target, Config::new().with_read_only(true))
            .expect_err("read-only in-memory must fail");
        assert_eq!(
            err,
            Error::configuration("Cannot launch in-memory database in read-only mode")
        );
    }
}

#[test]
fn test_anonymous_databases_are_private() {
    let registry = memory_registry();
    let a = registry.connect(":memory:", Config::default()).expect("a");
    let b = registry.connect("", Config::default()).expect("b");
    assert_ne!(a.identity().location(), b.identity().location());

    a.execute("CREATE TABLE only_a (id INTEGER)", ()).expect("create");
    assert!(b
        .execute("SELECT * FROM only_a", ())
        .expect_err("table must not leak")
        .is_not_found());
    assert_eq!(registry.instance_count(), 2);
}

#[test]
fn test_named_memory_is_shared() {
    let registry = memory_registry();
    let a = registry.connect(":memory:team", Config::default()).expect("a");
    let b = registry.connect("memory://team", Config::default()).expect("b");
    a.execute("CREATE TABLE t (id INTEGER)", ()).expect("create");
    b.execute("SELECT * FROM t", ()).expect("table visible");
}

#[test]
fn test_default_connection() {
    let registry = memory_registry();
    let a = registry.connect(":default:", Config::default()).expect("a");
    let b = registry.connect(":default:", Config::default()).expect("b");
    assert_eq!(a.id(), b.id(), "Default connection is a singleton");

    let err = registry
        .connect(":default:", Config::new().with_threads(1))
        .expect_err("options are not allowed");
    assert_eq!(
        err,
        Error::configuration(
            "Default connection fetching is only allowed without additional options"
        )
    );

    a.close().expect("close");
    let c = registry.connect(":default:", Config::default()).expect("c");
    assert_ne!(c.id(), a.id(), "A closed default connection is replaced");
    assert!(!c.is_closed());

    registry.close_default().expect("close default");
    assert!(c.is_closed());
    assert_eq!(registry.instance_count(), 0);
}

#[test]
fn test_concurrent_connects_construct_once() {
    let (registry, factory) =
        counting_registry(CountingFactory::slow(Duration::from_millis(50)));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .connect(":memory:race", Config::default())
                    .expect("connect")
            })
        })
        .collect();
    let conns: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    assert_eq!(factory.created(), 1);
    let location = Location::Memory("race".to_string());
    assert_eq!(registry.ref_count(&location), threads);

    drop(conns);
    assert_eq!(factory.closed(), 1);
    assert_eq!(registry.ref_count(&location), 0);
}

#[test]
fn test_concurrent_connects_with_different_threads_construct_once() {
    let (registry, factory) =
        counting_registry(CountingFactory::slow(Duration::from_millis(50)));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let config = if i % 2 == 0 {
                    Config::default()
                } else {
                    Config::new().with_threads(i)
                };
                barrier.wait();
                registry
                    .connect(":memory:mixed", config)
                    .expect("compatible configuration connects")
            })
        })
        .collect();
    let conns: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    assert_eq!(factory.created(), 1);
    let location = Location::Memory("mixed".to_string());
    assert_eq!(registry.ref_count(&location), threads);

    let first = conns[0].setting("threads").expect("setting");
    assert!(first.is_some());
    for conn in &conns {
        assert_eq!(conn.setting("threads").expect("setting"), first);
    }

    drop(conns);
    assert_eq!(factory.closed(), 1);
}

#[test]
fn test_failed_construction_is_retried() {
    let (registry, factory) = counting_registry(CountingFactory::default());
    factory
        .fail_next
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let err = registry
        .connect(":memory:flaky", Config::default())
        .expect_err("injected failure");
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(registry.instance_count(), 0);

    registry
        .connect(":memory:flaky", Config::default())
        .expect("second attempt builds a fresh engine");
    assert_eq!(factory.created(), 1);
}

#[test]
fn test_file_database_persists_across_instances() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("persist.db");
    let registry = memory_registry();

    {
        let conn = registry.connect(&path, Config::default()).expect("connect");
        conn.execute("CREATE TABLE kv (k TEXT, v INTEGER)", ())
            .expect("create");
        conn.execute("INSERT INTO kv VALUES ('a', 1), ('b', 2)", ())
            .expect("insert");
    }
    assert_eq!(registry.instance_count(), 0, "Dropping closes the instance");

    let reader = registry
        .connect(&path, Config::new().with_read_only(true))
        .expect("reopen read-only");
    let total: i64 = reader
        .query_one("SELECT sum(v) FROM kv", ())
        .expect("sum");
    assert_eq!(total, 3);
    assert!(reader.execute("INSERT INTO kv VALUES ('c', 3)", ()).is_err());
}

#[test]
fn test_global_connect() {
    let conn = stoolap_client::connect(":memory:", Config::default()).expect("connect");
    let one: i64 = conn.query_one("SELECT 1", ()).expect("select");
    assert_eq!(one, 1);
    conn.close().expect("close");
}
