// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use std::fmt;

/// Errors surfaced by the Unified Log decoder.
///
/// Catalog and timesync misses are recovered: the record is still emitted
/// with a placeholder value and the miss is reported on the diagnostics
/// channel. Chunk-level errors skip the offending chunk. File-level errors
/// (`Path`, `Dir`, `Read`, a bad file magic) terminate that file's parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Failed to open a file path
    Path,
    /// Failed to open a directory path
    Dir,
    /// Failed to read file contents
    Read,
    /// Read past the end of a buffer
    Truncated { offset: usize, chunk_tag: u32 },
    /// Chunk or file envelope had an unexpected magic value
    BadMagic { expected: u32, got: u32, offset: usize },
    /// Catalog v2 (macOS 10.12) or an unrecognized header version
    UnsupportedVersion(u16),
    /// LZ4 block stream failed to inflate to the declared size
    Lz4Failure(String),
    /// No uuidtext/dsc file is known for the UUID
    UuidNotFound(String),
    /// The UUID file is known but does not cover the requested offset
    OffsetOutOfRange { uuid: String, offset: u64 },
    /// No timesync boot record matches the boot UUID
    UnknownBoot(String),
    /// The format string consumed more arguments than the entry carried
    ArgumentShortfall,
    /// Unknown firehose argument descriptor high nibble
    BadArgumentDescriptor(u8),
}

impl std::error::Error for LogError {}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "Failed to open file path"),
            Self::Dir => write!(f, "Failed to open directory path"),
            Self::Read => write!(f, "Failed to read file"),
            Self::Truncated { offset, chunk_tag } => write!(
                f,
                "Truncated data at offset {offset} in chunk 0x{chunk_tag:x}"
            ),
            Self::BadMagic {
                expected,
                got,
                offset,
            } => write!(
                f,
                "Bad magic at offset {offset}. Expected 0x{expected:x}. Got: 0x{got:x}"
            ),
            Self::UnsupportedVersion(version) => {
                write!(f, "Unsupported format version: {version}")
            }
            Self::Lz4Failure(message) => write!(f, "Failed to decompress LZ4 data: {message}"),
            Self::UuidNotFound(uuid) => write!(f, "No string catalog for UUID {uuid}"),
            Self::OffsetOutOfRange { uuid, offset } => {
                write!(f, "Offset 0x{offset:x} out of range for UUID {uuid}")
            }
            Self::UnknownBoot(uuid) => write!(f, "No timesync data for boot UUID {uuid}"),
            Self::ArgumentShortfall => {
                write!(f, "Format string requires more arguments than provided")
            }
            Self::BadArgumentDescriptor(descriptor) => {
                write!(f, "Unknown firehose argument descriptor: 0x{descriptor:x}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogError;

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", LogError::UnknownBoot(String::from("ABCD"))),
            "No timesync data for boot UUID ABCD"
        );
        assert_eq!(
            format!(
                "{}",
                LogError::Truncated {
                    offset: 32,
                    chunk_tag: 0x6001
                }
            ),
            "Truncated data at offset 32 in chunk 0x6001"
        );
        assert_eq!(
            format!(
                "{}",
                LogError::OffsetOutOfRange {
                    uuid: String::from("AA"),
                    offset: 16
                }
            ),
            "Offset 0x10 out of range for UUID AA"
        );
    }
}
