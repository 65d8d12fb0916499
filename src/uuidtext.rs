// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{cstring, Bytes};
use log::error;
use nom::combinator::map;
use nom::multi::many_m_n;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::Needed;
use serde::{Deserialize, Serialize};

pub(crate) const UUIDTEXT_MAGIC: u32 = 0x66778899;
const SUPPORTED_MAJOR_VERSION: u32 = 2;

/// A `uuidtext/XX/<UUID>` string catalog: the format strings compiled into
/// one binary, plus the image path at the end of the pool
#[derive(Debug, Serialize, Deserialize)]
pub struct UuidText {
    /// Full 32-character uppercase hex UUID (directory prefix + file name)
    pub uuid: String,
    pub signature: u32,
    pub major_version: u32,
    pub minor_version: u32,
    pub entry_descriptors: Vec<UuidTextEntry>,
    /// Format string pool; the sender image path trails the final entry
    pub string_pool: Vec<u8>,
}

/// One `(range_start, size)` descriptor covering a run of format string
/// offsets inside the binary
#[derive(Debug, Serialize, Deserialize)]
pub struct UuidTextEntry {
    pub range_start: u32,
    pub size: u32,
}

impl UuidText {
    /// Parse a uuidtext file. Contains the base log format strings for one
    /// sender image
    pub fn parse(input: Bytes<'_>) -> nom::IResult<Bytes<'_>, UuidText> {
        let (input, signature) = le_u32(input)?;
        if signature != UUIDTEXT_MAGIC {
            error!(
                "[aulogs] Incorrect UUIDText header signature. Expected {:#x}. Got: {:#x}",
                UUIDTEXT_MAGIC, signature
            );
            return Err(nom::Err::Incomplete(Needed::Unknown));
        }

        let (input, (major_version, minor_version, number_entries)) =
            tuple((le_u32, le_u32, le_u32))(input)?;
        if major_version != SUPPORTED_MAJOR_VERSION {
            error!(
                "[aulogs] Unsupported UUIDText major version: {}",
                major_version
            );
            return Err(nom::Err::Incomplete(Needed::Unknown));
        }

        let (input, entry_descriptors) = many_m_n(
            number_entries as _,
            number_entries as _,
            map(tuple((le_u32, le_u32)), |(range_start, size)| {
                UuidTextEntry { range_start, size }
            }),
        )(input)?;

        Ok((
            input,
            UuidText {
                uuid: String::new(),
                signature,
                major_version,
                minor_version,
                entry_descriptors,
                string_pool: input.to_vec(),
            },
        ))
    }

    /// Resolve a format string offset against the entry descriptors. Each
    /// descriptor's pool data is laid out back to back, so the pool position
    /// is the sum of the preceding entry sizes plus the offset into the
    /// covering range
    pub fn format_at(&self, offset: u32) -> Option<String> {
        let mut pool_start: u32 = 0;
        for entry in &self.entry_descriptors {
            if entry.range_start > offset {
                pool_start += entry.size;
                continue;
            }
            let relative = offset - entry.range_start;
            if relative >= entry.size
                || self.string_pool.len() < (pool_start + relative) as usize
            {
                pool_start += entry.size;
                continue;
            }
            let start = &self.string_pool[(pool_start + relative) as usize..];
            return cstring(start).map(|(_, value)| value).ok();
        }
        None
    }

    /// The sender image path stored after the final format string entry
    pub fn image_path(&self) -> Option<String> {
        let pool_end: u32 = self.entry_descriptors.iter().map(|entry| entry.size).sum();
        if self.string_pool.len() < pool_end as usize {
            return None;
        }
        cstring(&self.string_pool[pool_end as usize..])
            .map(|(_, value)| value)
            .ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_uuidtext_bytes(
        entries: &[(u32, &[u8])],
        image_path: &str,
    ) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(&0x66778899_u32.to_le_bytes());
        data.extend_from_slice(&2_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (range_start, pool) in entries {
            data.extend_from_slice(&range_start.to_le_bytes());
            data.extend_from_slice(&(pool.len() as u32).to_le_bytes());
        }
        for (_, pool) in entries {
            data.extend_from_slice(pool);
        }
        data.extend_from_slice(image_path.as_bytes());
        data.push(0);
        data
    }

    #[test]
    fn test_parse_uuidtext() -> anyhow::Result<()> {
        let data = test_uuidtext_bytes(
            &[(0x100, b"hello %u\0"), (0x7433, b"done\0")],
            "/usr/libexec/testd",
        );

        let (_, uuidtext) = UuidText::parse(&data).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        assert_eq!(uuidtext.signature, 0x66778899);
        assert_eq!(uuidtext.major_version, 2);
        assert_eq!(uuidtext.minor_version, 1);
        assert_eq!(uuidtext.entry_descriptors.len(), 2);
        assert_eq!(uuidtext.entry_descriptors[0].range_start, 0x100);
        assert_eq!(uuidtext.entry_descriptors[0].size, 9);
        assert_eq!(uuidtext.entry_descriptors[1].range_start, 0x7433);
        Ok(())
    }

    #[test]
    fn test_format_at() -> anyhow::Result<()> {
        let data = test_uuidtext_bytes(
            &[(0x100, b"hello %u\0value=%{private}u\0"), (0x800, b"done\0")],
            "/usr/libexec/testd",
        );
        let (_, uuidtext) = UuidText::parse(&data).map_err(|e| anyhow::anyhow!(e.to_string()))?;

        assert_eq!(uuidtext.format_at(0x100).as_deref(), Some("hello %u"));
        assert_eq!(
            uuidtext.format_at(0x109).as_deref(),
            Some("value=%{private}u")
        );
        assert_eq!(uuidtext.format_at(0x800).as_deref(), Some("done"));
        assert_eq!(uuidtext.format_at(0x9999), None);
        Ok(())
    }

    #[test]
    fn test_format_at_stable_across_lookups() -> anyhow::Result<()> {
        let data = test_uuidtext_bytes(&[(0x40, b"stable %d\0")], "/bin/ls");
        let (_, uuidtext) = UuidText::parse(&data).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let first = uuidtext.format_at(0x40);
        let second = uuidtext.format_at(0x40);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("stable %d"));
        Ok(())
    }

    #[test]
    fn test_image_path() -> anyhow::Result<()> {
        let data = test_uuidtext_bytes(&[(0x100, b"hi\0")], "/usr/libexec/testd");
        let (_, uuidtext) = UuidText::parse(&data).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        assert_eq!(uuidtext.image_path().as_deref(), Some("/usr/libexec/testd"));
        Ok(())
    }

    #[test]
    fn test_bad_signature() {
        let data = [0xaa, 0xbb, 0xcc, 0xdd, 0, 0, 0, 0];
        assert!(UuidText::parse(&data).is_err());
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = test_uuidtext_bytes(&[], "/bin/ls");
        // Overwrite the major version field
        data[4..8].copy_from_slice(&9_u32.to_le_bytes());
        assert!(UuidText::parse(&data).is_err());
    }
}
