// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{cstring, extract_uuid, Bytes};
use log::error;
use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32, le_u64};
use nom::sequence::tuple;
use nom::Needed;
use serde::{Deserialize, Serialize};

pub(crate) const DSC_MAGIC: u32 = 0x64736368; // hcsd

/// A `uuidtext/dsc/<UUID>` shared cache string file: format strings for
/// everything in the dyld shared cache, referenced by virtual offset
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SharedCache {
    /// File name (the dsc UUID) in uppercase hex
    pub uuid: String,
    pub signature: u32,
    /// Version 1 up to Big Sur. Monterey has version 2
    pub major_version: u16,
    pub minor_version: u16,
    /// Sorted by `v_offset` for binary search
    pub ranges: Vec<DscRange>,
    pub uuids: Vec<DscUuid>,
}

/// One virtual address range of format strings belonging to a single image
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DscRange {
    pub uuid_index: u64,
    /// Virtual offset the firehose format_string_location is compared against.
    /// 8 bytes in major version 2, 4 bytes in version 1
    pub v_offset: u64,
    pub data_offset: u32,
    pub size: u32,
    /// The format string bytes covered by this range
    pub strings: Vec<u8>,
}

/// One image in the shared cache, with its load info and path
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DscUuid {
    /// 8 bytes in major version 2, 4 bytes in version 1
    pub v_offset: u64,
    pub size: u32,
    pub uuid: String,
    pub path_offset: u32,
    pub path: String,
}

impl SharedCache {
    /// Parse a dsc shared cache strings file (version 1 or 2)
    pub fn parse(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, SharedCache> {
        let (input, signature) = le_u32(data)?;
        if signature != DSC_MAGIC {
            error!(
                "[aulogs] Incorrect DSC file signature. Expected {:#x}. Got: {:#x}",
                DSC_MAGIC, signature
            );
            return Err(nom::Err::Incomplete(Needed::Unknown));
        }

        let (input, (major_version, minor_version, number_ranges, number_uuids)) =
            tuple((le_u16, le_u16, le_u32, le_u32))(input)?;

        const KNOWN_VERSIONS: [u16; 2] = [1, 2];
        if !KNOWN_VERSIONS.contains(&major_version) {
            error!("[aulogs] Unsupported DSC major version: {}", major_version);
            return Err(nom::Err::Incomplete(Needed::Unknown));
        }

        let mut shared_cache = SharedCache {
            signature,
            major_version,
            minor_version,
            ..Default::default()
        };

        let mut input = input;
        for _ in 0..number_ranges {
            let (remaining, range) = SharedCache::parse_range(input, major_version)?;
            shared_cache.ranges.push(range);
            input = remaining;
        }
        for _ in 0..number_uuids {
            let (remaining, uuid_entry) = SharedCache::parse_uuid_entry(input, major_version)?;
            shared_cache.uuids.push(uuid_entry);
            input = remaining;
        }

        for uuid_entry in &mut shared_cache.uuids {
            let (path_start, _) = take(uuid_entry.path_offset)(data)?;
            let (_, path) = cstring(path_start)?;
            uuid_entry.path = path;
        }
        for range in &mut shared_cache.ranges {
            let (strings_start, _) = take(range.data_offset)(data)?;
            let (_, strings) = take(range.size)(strings_start)?;
            range.strings = strings.to_vec();
        }

        // Ranges are stored sorted by virtual offset. Enforce the invariant
        // so lookup can binary search
        shared_cache.ranges.sort_by_key(|range| range.v_offset);

        Ok((input, shared_cache))
    }

    // Version 2 moved the uuid index to the end of the range descriptor and
    // widened the virtual offset to 8 bytes
    fn parse_range(data: Bytes<'_>, major_version: u16) -> nom::IResult<Bytes<'_>, DscRange> {
        const VERSION_TWO: u16 = 2;
        if major_version == VERSION_TWO {
            let (input, (v_offset, data_offset, size, uuid_index)) =
                tuple((le_u64, le_u32, le_u32, le_u64))(data)?;
            Ok((
                input,
                DscRange {
                    uuid_index,
                    v_offset,
                    data_offset,
                    size,
                    strings: Vec::new(),
                },
            ))
        } else {
            let (input, (uuid_index, v_offset, data_offset, size)) =
                tuple((le_u32, le_u32, le_u32, le_u32))(data)?;
            Ok((
                input,
                DscRange {
                    uuid_index: u64::from(uuid_index),
                    v_offset: u64::from(v_offset),
                    data_offset,
                    size,
                    strings: Vec::new(),
                },
            ))
        }
    }

    fn parse_uuid_entry(data: Bytes<'_>, major_version: u16) -> nom::IResult<Bytes<'_>, DscUuid> {
        const VERSION_TWO: u16 = 2;
        let (input, v_offset) = if major_version == VERSION_TWO {
            le_u64(data)?
        } else {
            let (input, value) = le_u32(data)?;
            (input, u64::from(value))
        };

        let (input, size) = le_u32(input)?;
        let (input, uuid) = extract_uuid(input)?;
        let (input, path_offset) = le_u32(input)?;

        Ok((
            input,
            DscUuid {
                v_offset,
                size,
                uuid,
                path_offset,
                path: String::new(),
            },
        ))
    }

    /// Resolve a virtual offset to the format string and owning image.
    /// Binary search over the sorted ranges, then test membership in
    /// `[v_offset, v_offset + size)`
    pub fn resolve(&self, offset: u64) -> Option<(String, &DscUuid)> {
        let index = self.ranges.partition_point(|range| range.v_offset <= offset);
        if index == 0 {
            return None;
        }

        let range = &self.ranges[index - 1];
        if offset >= range.v_offset + u64::from(range.size) {
            return None;
        }
        let relative = (offset - range.v_offset) as usize;
        if relative >= range.strings.len() {
            return None;
        }
        let uuid_entry = self.uuids.get(range.uuid_index as usize)?;
        let (_, format_string) = cstring(&range.strings[relative..]).ok()?;
        Some((format_string, uuid_entry))
    }

    /// Image info for a bad offset: Apple still reports the first range's
    /// library when the code pointer is invalid
    pub fn first_image(&self) -> Option<&DscUuid> {
        let range = self.ranges.first()?;
        self.uuids.get(range.uuid_index as usize)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_dsc_bytes(ranges: &[(u64, &[u8])], path: &str, image_uuid: u128) -> Vec<u8> {
        // Version 1 layout with one uuid entry shared by every range
        let mut header: Vec<u8> = Vec::new();
        header.extend_from_slice(&0x64736368_u32.to_le_bytes());
        header.extend_from_slice(&1_u16.to_le_bytes());
        header.extend_from_slice(&0_u16.to_le_bytes());
        header.extend_from_slice(&(ranges.len() as u32).to_le_bytes());
        header.extend_from_slice(&1_u32.to_le_bytes());

        let ranges_size = ranges.len() * 16;
        let uuids_size = 28;
        let pools_start = header.len() + ranges_size + uuids_size;

        let mut pool: Vec<u8> = Vec::new();
        let mut range_entries: Vec<u8> = Vec::new();
        for (v_offset, strings) in ranges {
            range_entries.extend_from_slice(&0_u32.to_le_bytes());
            range_entries.extend_from_slice(&(*v_offset as u32).to_le_bytes());
            range_entries.extend_from_slice(&((pools_start + pool.len()) as u32).to_le_bytes());
            range_entries.extend_from_slice(&(strings.len() as u32).to_le_bytes());
            pool.extend_from_slice(strings);
        }

        let path_offset = pools_start + pool.len();
        let mut uuid_entry: Vec<u8> = Vec::new();
        uuid_entry.extend_from_slice(&0_u32.to_le_bytes());
        uuid_entry.extend_from_slice(&0x2000_u32.to_le_bytes());
        uuid_entry.extend_from_slice(&image_uuid.to_be_bytes());
        uuid_entry.extend_from_slice(&(path_offset as u32).to_le_bytes());

        let mut data = header;
        data.append(&mut range_entries);
        data.append(&mut uuid_entry);
        data.append(&mut pool);
        data.extend_from_slice(path.as_bytes());
        data.push(0);
        data
    }

    #[test]
    fn test_parse_dsc_version_one() {
        let data = test_dsc_bytes(
            &[(0x1000, b"%@ start\0"), (0x2000, b"stop %d\0")],
            "/usr/lib/system/libsystem_blocks.dylib",
            0x4DF6D8F5D9C23A968DE45E99D6B73DC8,
        );

        let (_, shared_cache) = SharedCache::parse(&data).unwrap();
        assert_eq!(shared_cache.signature, 0x64736368);
        assert_eq!(shared_cache.major_version, 1);
        assert_eq!(shared_cache.ranges.len(), 2);
        assert_eq!(shared_cache.uuids.len(), 1);
        assert_eq!(
            shared_cache.uuids[0].uuid,
            "4DF6D8F5D9C23A968DE45E99D6B73DC8"
        );
        assert_eq!(
            shared_cache.uuids[0].path,
            "/usr/lib/system/libsystem_blocks.dylib"
        );
        assert_eq!(shared_cache.ranges[0].v_offset, 0x1000);
        assert_eq!(shared_cache.ranges[0].strings, b"%@ start\0");
    }

    #[test]
    fn test_resolve() {
        let data = test_dsc_bytes(
            &[(0x1000, b"%@ start\0second\0"), (0x2000, b"stop %d\0")],
            "/usr/lib/libnetwork.dylib",
            0xE185D902AC7F304487C0AE2887C59CE7,
        );
        let (_, shared_cache) = SharedCache::parse(&data).unwrap();

        let (format_string, image) = shared_cache.resolve(0x1000).unwrap();
        assert_eq!(format_string, "%@ start");
        assert_eq!(image.path, "/usr/lib/libnetwork.dylib");
        assert_eq!(image.uuid, "E185D902AC7F304487C0AE2887C59CE7");

        let (format_string, _) = shared_cache.resolve(0x1009).unwrap();
        assert_eq!(format_string, "second");

        let (format_string, _) = shared_cache.resolve(0x2000).unwrap();
        assert_eq!(format_string, "stop %d");

        assert!(shared_cache.resolve(0x500).is_none());
        assert!(shared_cache.resolve(0x9000).is_none());
    }

    #[test]
    fn test_resolve_repeat_lookups_stable() {
        let data = test_dsc_bytes(
            &[(0x4000, b"repeat %s\0")],
            "/usr/lib/libobjc.dylib",
            0x11112222333344445555666677778888,
        );
        let (_, shared_cache) = SharedCache::parse(&data).unwrap();
        let first = shared_cache.resolve(0x4000).map(|(s, u)| (s, u.path.clone()));
        let second = shared_cache.resolve(0x4000).map(|(s, u)| (s, u.path.clone()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_bad_signature() {
        let data = [0x00, 0x11, 0x22, 0x33, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(SharedCache::parse(&data).is_err());
    }

    #[test]
    fn test_parse_dsc_version_two() {
        // Version 2 range and uuid descriptors carry 8-byte virtual offsets
        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(&0x64736368_u32.to_le_bytes());
        data.extend_from_slice(&2_u16.to_le_bytes());
        data.extend_from_slice(&0_u16.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());

        let pools_start = data.len() + 24 + 32;
        // Range: v_offset, data_offset, size, uuid index
        data.extend_from_slice(&0x50000_u64.to_le_bytes());
        data.extend_from_slice(&(pools_start as u32).to_le_bytes());
        data.extend_from_slice(&5_u32.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        // Uuid entry: v_offset, size, uuid, path offset
        data.extend_from_slice(&0x50000_u64.to_le_bytes());
        data.extend_from_slice(&0x2000_u32.to_le_bytes());
        data.extend_from_slice(&0x326DD91B4EF83D80B90BF50EB7D7FDB8_u128.to_be_bytes());
        data.extend_from_slice(&((pools_start + 5) as u32).to_le_bytes());
        data.extend_from_slice(b"%llu\0");
        data.extend_from_slice(b"/usr/lib/test.dylib\0");

        let (_, shared_cache) = SharedCache::parse(&data).unwrap();
        assert_eq!(shared_cache.major_version, 2);
        assert_eq!(shared_cache.ranges[0].v_offset, 0x50000);
        assert_eq!(shared_cache.uuids[0].uuid, "326DD91B4EF83D80B90BF50EB7D7FDB8");
        let (format_string, image) = shared_cache.resolve(0x50000).unwrap();
        assert_eq!(format_string, "%llu");
        assert_eq!(image.path, "/usr/lib/test.dylib");
    }
}
