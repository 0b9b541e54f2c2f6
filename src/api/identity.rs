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

//! Storage targets and their normalized locations
//!
//! A connect request names a [`Target`]. Accepted spellings:
//!
//! - `""`, `":memory:"`, `"memory://"` - a fresh anonymous in-memory database
//! - `":memory:tag"`, `"memory://tag"` - a named in-memory database
//! - `":default:"` - the registry's default connection
//! - `"file:///path"` or any other string - a database file
//!
//! File paths are canonicalized so that different spellings of one file
//! resolve to the same [`Location`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::{Error, Result};
use crate::storage::ConfigFingerprint;

/// Storage scheme constants
pub const MEMORY_SCHEME: &str = "memory";
pub const FILE_SCHEME: &str = "file";

const MEMORY_ALIAS: &str = ":memory:";
const DEFAULT_ALIAS: &str = ":default:";

/// Normalized storage location, the key of the instance registry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// Private in-memory database, numbered by the registry
    Anonymous(u64),
    /// Shared in-memory database
    Memory(String),
    /// The registry's default database
    Default,
    /// Canonicalized database file
    File(PathBuf),
}

impl Location {
    pub fn is_in_memory(&self) -> bool {
        !matches!(self, Location::File(_))
    }

    /// Database file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Location::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Anonymous(n) => write!(f, "{}#{}", MEMORY_ALIAS, n),
            Location::Memory(tag) => write!(f, "{}{}", MEMORY_ALIAS, tag),
            Location::Default => write!(f, "{}", DEFAULT_ALIAS),
            Location::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Location plus the configuration fingerprint it was opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageIdentity {
    location: Location,
    fingerprint: ConfigFingerprint,
}

impl StorageIdentity {
    pub fn new(location: Location, fingerprint: ConfigFingerprint) -> Self {
        Self {
            location,
            fingerprint,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn fingerprint(&self) -> &ConfigFingerprint {
        &self.fingerprint
    }
}

impl fmt::Display for StorageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// What a caller asked to connect to, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    AnonymousMemory,
    NamedMemory(String),
    Default,
    File(PathBuf),
}

impl Target {
    /// Interpret a connect string
    pub fn parse(target: &str) -> Target {
        let trimmed = target.trim();
        if trimmed.is_empty() || trimmed == MEMORY_ALIAS {
            return Target::AnonymousMemory;
        }
        if trimmed == DEFAULT_ALIAS {
            return Target::Default;
        }
        if let Some(tag) = trimmed.strip_prefix(MEMORY_ALIAS) {
            return Target::NamedMemory(tag.to_string());
        }
        if let Some((scheme, rest)) = trimmed.split_once("://") {
            if scheme.eq_ignore_ascii_case(MEMORY_SCHEME) {
                return if rest.is_empty() {
                    Target::AnonymousMemory
                } else {
                    Target::NamedMemory(rest.to_string())
                };
            }
            if scheme.eq_ignore_ascii_case(FILE_SCHEME) {
                return Target::File(PathBuf::from(rest));
            }
        }
        Target::File(PathBuf::from(trimmed))
    }

    /// Normalize into a registry location
    ///
    /// `next_anonymous` numbers anonymous databases; `Default` is handled
    /// by the registry before resolution and maps to [`Location::Default`].
    pub fn resolve(self, next_anonymous: impl FnOnce() -> u64) -> Result<Location> {
        match self {
            Target::AnonymousMemory => Ok(Location::Anonymous(next_anonymous())),
            Target::NamedMemory(tag) => Ok(Location::Memory(tag)),
            Target::Default => Ok(Location::Default),
            Target::File(path) => canonicalize(&path).map(Location::File),
        }
    }
}

/// Types accepted as a connect target
pub trait IntoTarget {
    fn into_target(self) -> Target;
}

impl IntoTarget for Target {
    fn into_target(self) -> Target {
        self
    }
}

impl IntoTarget for &str {
    fn into_target(self) -> Target {
        Target::parse(self)
    }
}

impl IntoTarget for String {
    fn into_target(self) -> Target {
        Target::parse(&self)
    }
}

impl IntoTarget for &String {
    fn into_target(self) -> Target {
        Target::parse(self)
    }
}

impl IntoTarget for &Path {
    fn into_target(self) -> Target {
        Target::File(self.to_path_buf())
    }
}

impl IntoTarget for PathBuf {
    fn into_target(self) -> Target {
        Target::File(self)
    }
}

impl IntoTarget for &PathBuf {
    fn into_target(self) -> Target {
        Target::File(self.clone())
    }
}

/// Canonicalize a database path that may not exist yet
fn canonicalize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::configuration("database path cannot be empty"));
    }
    if path.exists() {
        return Ok(path.canonicalize()?);
    }
    let file_name = path.file_name().ok_or_else(|| {
        Error::configuration(format!("'{}' does not name a database file", path.display()))
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize().map_err(|e| {
            Error::io(format!(
                "Cannot open file \"{}\": {}",
                path.display(),
                e
            ))
        })?,
        _ => std::env::current_dir()?,
    };
    Ok(parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_targets() {
        assert_eq!(Target::parse(""), Target::AnonymousMemory);
        assert_eq!(Target::parse(":memory:"), Target::AnonymousMemory);
        assert_eq!(Target::parse("memory://"), Target::AnonymousMemory);
        assert_eq!(
            Target::parse(":memory:shared"),
            Target::NamedMemory("shared".to_string())
        );
        assert_eq!(
            Target::parse("MEMORY://shared"),
            Target::NamedMemory("shared".to_string())
        );
        assert_eq!(Target::parse(":default:"), Target::Default);
    }

    #[test]
    fn test_parse_file_targets() {
        assert_eq!(
            Target::parse("file:///tmp/x.db"),
            Target::File(PathBuf::from("/tmp/x.db"))
        );
        assert_eq!(Target::parse("data.db"), Target::File(PathBuf::from("data.db")));
        assert_eq!(Target::parse(" data.db "), Target::File(PathBuf::from("data.db")));
        assert_eq!(Target::parse(" :default: "), Target::Default);
        assert_eq!(
            Path::new("a/b.db").into_target(),
            Target::File(PathBuf::from("a/b.db"))
        );
    }

    #[test]
    fn test_anonymous_locations_are_unique() {
        let mut n = 0;
        let mut next = || {
            n += 1;
            n
        };
        let a = Target::AnonymousMemory.resolve(&mut next).unwrap();
        let b = Target::AnonymousMemory.resolve(&mut next).unwrap();
        assert_ne!(a, b);
        assert!(a.is_in_memory());
        assert!(a.path().is_none());
    }

    #[test]
    fn test_file_spellings_resolve_to_one_location() {
        let dir = tempfile::tempdir().unwrap();
        let direct = dir.path().join("db.json");
        let dotted = dir.path().join(".").join("db.json");

        let a = Target::File(direct.clone()).resolve(|| 0).unwrap();
        let b = Target::File(dotted).resolve(|| 0).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_in_memory());

        std::fs::write(&direct, b"").unwrap();
        let c = Target::File(direct).resolve(|| 0).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("db.json");
        assert!(matches!(
            Target::File(path).resolve(|| 0),
            Err(Error::Io { .. })
        ));
        assert!(matches!(
            Target::File(PathBuf::new()).resolve(|| 0),
            Err(Error::Configuration(_))
        ));
    }
}
