// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! The uuidtext/dsc string store shared read-only by every tracev3 decoder.

use crate::dsc::SharedCache;
use crate::error::LogError;
use crate::uuidtext::UuidText;
use log::{error, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// The most significant bit of a format string location marks a "dynamic"
/// format: the message is the argument itself, rendered through `%s`
pub(crate) const DYNAMIC_FMT_BIT: u64 = 0x80000000;

/// Loaded uuidtext and dsc catalogs, keyed by 32-character uppercase UUID
#[derive(Debug, Default)]
pub struct StringCatalog {
    uuidtext: HashMap<String, UuidText>,
    dsc: HashMap<String, SharedCache>,
}

/// Result of resolving a log site against the string catalogs. Misses still
/// produce a value so a record can be emitted; `error` carries the reason
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFormat {
    pub format_string: String,
    pub library_path: String,
    pub library_uuid: String,
    pub error: Option<LogError>,
}

impl StringCatalog {
    /// Index all catalog files under a uuidtext root: `XX/<28 hex>` string
    /// files (the two-character directory is the UUID prefix) and the shared
    /// caches in `dsc/`
    pub fn load(root: &Path) -> Result<Self, LogError> {
        let mut catalog = StringCatalog::default();

        let dir = fs::read_dir(root).map_err(|err| {
            error!("[aulogs] Failed to read uuidtext directory {root:?}: {err:?}");
            LogError::Dir
        })?;

        for entry in dir.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !entry.path().is_dir() {
                continue;
            }
            if name.eq_ignore_ascii_case("dsc") {
                catalog.load_dsc_dir(&entry.path());
                continue;
            }
            // uuidtext subdirectories are the first two hex characters of the UUID
            if name.len() != 2 || !name.chars().all(|value| value.is_ascii_hexdigit()) {
                continue;
            }
            catalog.load_uuidtext_dir(&entry.path(), &name.to_uppercase());
        }
        Ok(catalog)
    }

    fn load_uuidtext_dir(&mut self, dir: &Path, prefix: &str) {
        let Ok(entries) = fs::read_dir(dir) else {
            warn!("[aulogs] Failed to read uuidtext subdirectory {dir:?}");
            return;
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().to_uppercase();
            let buffer = match fs::read(entry.path()) {
                Ok(buffer) => buffer,
                Err(err) => {
                    error!("[aulogs] Failed to read UUID file {:?}: {err:?}", entry.path());
                    continue;
                }
            };
            match UuidText::parse(&buffer) {
                Ok((_, mut uuidtext)) => {
                    uuidtext.uuid = format!("{prefix}{file_name}");
                    self.uuidtext.insert(uuidtext.uuid.clone(), uuidtext);
                }
                Err(err) => {
                    error!(
                        "[aulogs] Failed to parse UUID file {:?}: {err:?}",
                        entry.path()
                    );
                }
            }
        }
    }

    fn load_dsc_dir(&mut self, dir: &Path) {
        let Ok(entries) = fs::read_dir(dir) else {
            warn!("[aulogs] Failed to read dsc directory {dir:?}");
            return;
        };
        for entry in entries.flatten() {
            let buffer = match fs::read(entry.path()) {
                Ok(buffer) => buffer,
                Err(err) => {
                    error!("[aulogs] Failed to read dsc file {:?}: {err:?}", entry.path());
                    continue;
                }
            };
            match SharedCache::parse(&buffer) {
                Ok((_, mut shared_cache)) => {
                    shared_cache.uuid = entry.file_name().to_string_lossy().to_uppercase();
                    self.dsc.insert(shared_cache.uuid.clone(), shared_cache);
                }
                Err(err) => {
                    error!("[aulogs] Failed to parse dsc file {:?}: {err:?}", entry.path());
                }
            }
        }
    }

    /// Build a catalog from already-parsed entries. Used when the consumer
    /// streams catalog files itself
    pub fn with_entries(uuidtext: Vec<UuidText>, shared_caches: Vec<SharedCache>) -> Self {
        StringCatalog {
            uuidtext: uuidtext
                .into_iter()
                .map(|entry| (entry.uuid.clone(), entry))
                .collect(),
            dsc: shared_caches
                .into_iter()
                .map(|entry| (entry.uuid.clone(), entry))
                .collect(),
        }
    }

    pub fn uuidtext(&self, uuid: &str) -> Option<&UuidText> {
        self.uuidtext.get(uuid)
    }

    pub fn shared_cache(&self, uuid: &str) -> Option<&SharedCache> {
        self.dsc.get(uuid)
    }

    /// The sender image path recorded at the end of a uuidtext string pool
    pub fn image_path(&self, uuid: &str) -> Option<String> {
        self.uuidtext.get(uuid)?.image_path()
    }

    /// Resolve `(uuid, offset)` to a format string, library path, and
    /// library UUID. `via_dsc` selects the shared cache path. A miss yields
    /// a synthetic message plus the error so output is still produced
    pub fn resolve_fmt(&self, uuid: &str, offset: u64, via_dsc: bool) -> ResolvedFormat {
        // A set high bit means the format is the argument itself
        if offset & DYNAMIC_FMT_BIT != 0 {
            let mut resolved = self.resolve_fmt(uuid, offset & !DYNAMIC_FMT_BIT, via_dsc);
            resolved.format_string = String::from("%s");
            resolved.error = None;
            return resolved;
        }

        if via_dsc {
            self.resolve_dsc_fmt(uuid, offset)
        } else {
            self.resolve_uuidtext_fmt(uuid, offset)
        }
    }

    fn resolve_dsc_fmt(&self, uuid: &str, offset: u64) -> ResolvedFormat {
        let Some(shared_cache) = self.dsc.get(uuid) else {
            warn!("[aulogs] No dsc file for UUID {uuid}");
            return ResolvedFormat::missing(uuid, offset, LogError::UuidNotFound(uuid.to_string()));
        };

        if let Some((format_string, image)) = shared_cache.resolve(offset) {
            return ResolvedFormat {
                format_string,
                library_path: image.path.clone(),
                library_uuid: image.uuid.clone(),
                error: None,
            };
        }

        // Invalid shared cache offsets still report the first image, the
        // same way log show renders <Invalid shared cache code pointer offset>
        warn!("[aulogs] Invalid dsc offset {offset:#x} for UUID {uuid}");
        let (library_path, library_uuid) = shared_cache
            .first_image()
            .map(|image| (image.path.clone(), image.uuid.clone()))
            .unwrap_or_default();
        ResolvedFormat {
            format_string: format!("<missing format at {uuid}+{offset:#x}>"),
            library_path,
            library_uuid,
            error: Some(LogError::OffsetOutOfRange {
                uuid: uuid.to_string(),
                offset,
            }),
        }
    }

    fn resolve_uuidtext_fmt(&self, uuid: &str, offset: u64) -> ResolvedFormat {
        let Some(uuidtext) = self.uuidtext.get(uuid) else {
            warn!("[aulogs] No uuidtext file for UUID {uuid}");
            return ResolvedFormat::missing(uuid, offset, LogError::UuidNotFound(uuid.to_string()));
        };

        let library_path = uuidtext.image_path().unwrap_or_default();
        if let Some(format_string) = uuidtext.format_at(offset as u32) {
            return ResolvedFormat {
                format_string,
                library_path,
                library_uuid: uuid.to_string(),
                error: None,
            };
        }

        warn!("[aulogs] Invalid uuidtext offset {offset:#x} for UUID {uuid}");
        ResolvedFormat {
            format_string: format!("<missing format at {uuid}+{offset:#x}>"),
            library_path,
            library_uuid: uuid.to_string(),
            error: Some(LogError::OffsetOutOfRange {
                uuid: uuid.to_string(),
                offset,
            }),
        }
    }
}

impl ResolvedFormat {
    fn missing(uuid: &str, offset: u64, error: LogError) -> Self {
        ResolvedFormat {
            format_string: format!("<missing format at {uuid}+{offset:#x}>"),
            library_path: String::new(),
            library_uuid: uuid.to_string(),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StringCatalog;
    use crate::dsc::SharedCache;
    use crate::error::LogError;
    use crate::uuidtext::UuidText;

    fn test_catalog() -> StringCatalog {
        let uuid_data = crate::uuidtext::tests::test_uuidtext_bytes(
            &[(0x100, b"hello %u\0")],
            "/usr/libexec/testd",
        );
        let (_, mut uuidtext) = UuidText::parse(&uuid_data).unwrap();
        uuidtext.uuid = String::from("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

        let dsc_data = crate::dsc::tests::test_dsc_bytes(
            &[(0x1000, b"%@ start\0")],
            "/usr/lib/system/libsystem.dylib",
            0x11112222333344445555666677778888,
        );
        let (_, mut shared_cache) = SharedCache::parse(&dsc_data).unwrap();
        shared_cache.uuid = String::from("DDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD");

        StringCatalog::with_entries(vec![uuidtext], vec![shared_cache])
    }

    #[test]
    fn test_resolve_fmt_uuidtext() {
        let catalog = test_catalog();
        let resolved = catalog.resolve_fmt("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", 0x100, false);
        assert_eq!(resolved.format_string, "hello %u");
        assert_eq!(resolved.library_path, "/usr/libexec/testd");
        assert_eq!(resolved.library_uuid, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
        assert!(resolved.error.is_none());
    }

    #[test]
    fn test_resolve_fmt_dsc() {
        let catalog = test_catalog();
        let resolved = catalog.resolve_fmt("DDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD", 0x1000, true);
        assert_eq!(resolved.format_string, "%@ start");
        assert_eq!(resolved.library_path, "/usr/lib/system/libsystem.dylib");
        assert_eq!(resolved.library_uuid, "11112222333344445555666677778888");
    }

    #[test]
    fn test_resolve_fmt_unknown_uuid() {
        let catalog = test_catalog();
        let resolved = catalog.resolve_fmt("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF", 0x10, false);
        assert!(resolved.format_string.starts_with("<missing format at"));
        assert_eq!(
            resolved.error,
            Some(LogError::UuidNotFound(String::from(
                "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF"
            )))
        );
    }

    #[test]
    fn test_resolve_fmt_bad_offset() {
        let catalog = test_catalog();
        let resolved = catalog.resolve_fmt("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", 0x9999, false);
        assert!(resolved.format_string.starts_with("<missing format at"));
        assert!(matches!(
            resolved.error,
            Some(LogError::OffsetOutOfRange { .. })
        ));
        // Library info is still reported on a bad offset
        assert_eq!(resolved.library_path, "/usr/libexec/testd");
    }

    #[test]
    fn test_resolve_fmt_dynamic() {
        let catalog = test_catalog();
        let resolved =
            catalog.resolve_fmt("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", 0x80000100, false);
        assert_eq!(resolved.format_string, "%s");
        assert!(resolved.error.is_none());
    }

    #[test]
    fn test_image_path() {
        let catalog = test_catalog();
        assert_eq!(
            catalog
                .image_path("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
                .as_deref(),
            Some("/usr/libexec/testd")
        );
        assert!(catalog.image_path("0000").is_none());
    }
}
