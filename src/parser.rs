// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! Top-level helpers: collect the shared read-only inputs from a
//! diagnostics tree or logarchive and drive single-file parses.

use crate::catalog::StringCatalog;
use crate::emit::RecordAssembler;
use crate::error::LogError;
use crate::record::LogRecord;
use crate::timesync::{TimesyncBoot, TimesyncDb};
use crate::tracev3::TraceData;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Parse the UUID string files on a live macOS system
pub fn collect_strings_system() -> Result<StringCatalog, LogError> {
    collect_strings(Path::new("/private/var/db/uuidtext"))
}

/// Parse the timesync files on a live macOS system
pub fn collect_timesync_system() -> Result<TimesyncDb, LogError> {
    collect_timesync(Path::new("/private/var/db/diagnostics/timesync"))
}

/// Index all uuidtext and dsc catalog files under a uuidtext root (or a
/// `.logarchive`, which uses the same layout)
pub fn collect_strings(path: &Path) -> Result<StringCatalog, LogError> {
    StringCatalog::load(path)
}

/// Parse every `*.timesync` file in a directory into one keyed store
pub fn collect_timesync(path: &Path) -> Result<TimesyncDb, LogError> {
    let dir = fs::read_dir(path).map_err(|err| {
        error!("[aulogs] Failed to read timesync directory {path:?}: {err:?}");
        LogError::Path
    })?;

    let mut boots: Vec<TimesyncBoot> = Vec::new();
    for entry in dir.flatten() {
        let file_path = entry.path();
        if file_path
            .extension()
            .map(|extension| extension != "timesync")
            .unwrap_or(true)
        {
            continue;
        }

        let buffer = match fs::read(&file_path) {
            Ok(buffer) => buffer,
            Err(err) => {
                error!("[aulogs] Failed to read timesync file {file_path:?}: {err:?}");
                continue;
            }
        };
        info!(
            "Read {} bytes from timesync file {}",
            buffer.len(),
            file_path.display()
        );

        match TimesyncBoot::parse_timesync_data(&buffer) {
            Ok((_, mut parsed)) => boots.append(&mut parsed),
            Err(err) => {
                error!("[aulogs] Failed to parse timesync file {file_path:?}: {err:?}");
            }
        }
    }
    Ok(TimesyncDb::from_boots(boots))
}

/// Recursively find `*.tracev3` files under a directory, sorted for
/// deterministic output
pub fn find_tracev3_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|extension| extension == "tracev3")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Read and decode one tracev3 file
pub fn parse_tracev3(path: &Path) -> Result<TraceData, LogError> {
    let buffer = fs::read(path).map_err(|err| {
        error!("[aulogs] Failed to read tracev3 file {path:?}: {err:?}");
        LogError::Read
    })?;
    info!("Read {} bytes for file {}", buffer.len(), path.display());
    TraceData::parse(&buffer)
}

/// Reconstruct log records from decoded tracev3 data plus the shared
/// read-only catalog and timesync stores
pub fn build_log(
    trace: &TraceData,
    catalog: &StringCatalog,
    timesync: &TimesyncDb,
) -> Result<Vec<LogRecord>, regex::Error> {
    let assembler = RecordAssembler::new(catalog, timesync)?;
    Ok(assembler.collect(trace))
}

#[cfg(test)]
mod tests {
    use super::{collect_strings, collect_timesync, find_tracev3_files};
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("aulogs_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_collect_timesync_dir() {
        let dir = temp_dir("timesync");

        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(&0xbbb0_u16.to_le_bytes());
        data.extend_from_slice(&48_u16.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&0x845B0DD50160453EACE038760C7B5C1D_u128.to_be_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&1622314506201049000_i64.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        fs::write(dir.join("0000000000000002.timesync"), &data).unwrap();
        // Non-timesync files are ignored
        fs::write(dir.join("notes.txt"), b"ignore me").unwrap();

        let timesync = collect_timesync(&dir).unwrap();
        assert!(timesync
            .boot("845B0DD50160453EACE038760C7B5C1D")
            .is_some());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_collect_timesync_missing_dir() {
        let result = collect_timesync(std::path::Path::new("/nonexistent/aulogs/timesync"));
        assert!(result.is_err());
    }

    #[test]
    fn test_collect_strings_dir() {
        let dir = temp_dir("uuidtext");
        fs::create_dir_all(dir.join("AA")).unwrap();

        let uuid_data = crate::uuidtext::tests::test_uuidtext_bytes(
            &[(0x100, b"hello %u\0")],
            "/usr/libexec/testd",
        );
        fs::write(dir.join("AA/AAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"), &uuid_data).unwrap();

        let catalog = collect_strings(&dir).unwrap();
        let resolved = catalog.resolve_fmt("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", 0x100, false);
        assert_eq!(resolved.format_string, "hello %u");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_find_tracev3_files() {
        let dir = temp_dir("tracev3");
        fs::create_dir_all(dir.join("Persist")).unwrap();
        fs::write(dir.join("Persist/0000000000000002.tracev3"), b"x").unwrap();
        fs::write(dir.join("Persist/0000000000000001.tracev3"), b"x").unwrap();
        fs::write(dir.join("Persist/readme.md"), b"x").unwrap();

        let files = find_tracev3_files(&dir);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("0000000000000001.tracev3"));
        assert!(files[1].ends_with("0000000000000002.tracev3"));

        let _ = fs::remove_dir_all(&dir);
    }
}
