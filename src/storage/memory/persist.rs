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

//! JSON snapshot persistence for file-backed engines
//!
//! The snapshot is written to a sibling temporary file and renamed over the
//! database file, so a crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, Table};
use crate::core::{Error, Result};

/// Snapshot format version
pub const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format: u32,
    tables: Vec<Table>,
}

/// Load the catalog stored at `path`, or `None` if the file does not exist
pub fn load(path: &Path) -> Result<Option<Catalog>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if bytes.is_empty() {
        return Ok(Some(Catalog::new()));
    }
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(Error::io(format!(
            "unsupported snapshot format {} in {}",
            snapshot.format,
            path.display()
        )));
    }
    Ok(Some(Catalog::from_tables(snapshot.tables)))
}

/// Write `catalog` to `path` atomically
pub fn save(path: &Path, catalog: &Catalog) -> Result<()> {
    let snapshot = Snapshot {
        format: SNAPSHOT_FORMAT,
        tables: catalog.to_tables(),
    };
    let bytes = serde_json::to_vec(&snapshot)?;
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
