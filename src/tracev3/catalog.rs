// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{cstring, extract_uuid, padding_size_8, Bytes};
use crate::tracev3::chunkset::ALGORITHM_LZ4;
use log::warn;
use nom::bytes::complete::take;
use nom::error::{make_error, ErrorKind};
use nom::multi::many_m_n;
use nom::number::complete::{le_u16, le_u32, le_u64};
use nom::sequence::tuple;

/// The catalog chunk (tag 0x600B) inside a tracev3 file. Immutable once
/// parsed; a later catalog chunk swaps in a fresh snapshot, it never
/// mutates this one. Firehose entries are interpreted against the snapshot
/// that was current when their page was read
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Offsets in the chunk header are relative to the start of this table
    pub uuids: Vec<String>,
    pub subsystem_strings: Vec<u8>,
    pub process_info: Vec<ProcessInfo>,
    pub sub_chunks: Vec<CatalogSubChunk>,
    pub earliest_firehose_timestamp: u64,
}

/// One process identity the catalog knows about, keyed by the
/// `(proc_id_1, proc_id_2)` pair firehose pages carry
#[derive(Debug, Clone, Default)]
pub struct ProcessInfo {
    pub index: u16,
    pub main_uuid_index: u16,
    pub dsc_uuid_index: u16,
    pub proc_id_1: u64,
    pub proc_id_2: u32,
    pub pid: u32,
    pub euid: u32,
    pub uuids_used: Vec<ProcessUuidEntry>,
    pub subsystems: Vec<SubsystemEntry>,
    /// Main executable UUID resolved from the catalog uuid table
    pub main_uuid: String,
    /// Shared cache UUID resolved from the catalog uuid table
    pub dsc_uuid: String,
}

/// A UUID referenced by a process entry, with its load window. Entries with
/// the absolute format flag index into this table
#[derive(Debug, Clone, Default)]
pub struct ProcessUuidEntry {
    pub size: u32,
    pub uuid_index: u16,
    pub load_address: u64,
    pub uuid: String,
}

/// Subsystem/category string offsets for one subsystem identifier
#[derive(Debug, Clone, Default)]
pub struct SubsystemEntry {
    pub identifier: u16,
    pub subsystem_offset: u16,
    pub category_offset: u16,
}

/// Compression metadata and time window for one ChunkSet that follows the
/// catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogSubChunk {
    pub start_time: u64,
    pub end_time: u64,
    pub uncompressed_size: u32,
    pub compression_algorithm: u32,
    pub chunk_uuid_indexes: Vec<u16>,
    pub string_indexes: Vec<u16>,
}

impl CatalogSnapshot {
    /// Parse a catalog chunk body (bytes after the chunk envelope)
    pub fn parse(body: Bytes<'_>) -> nom::IResult<Bytes<'_>, CatalogSnapshot> {
        let (
            input,
            (
                subsystem_strings_offset,
                process_info_offset,
                process_info_count,
                _sub_chunks_offset,
                sub_chunk_count,
            ),
        ) = tuple((le_u16, le_u16, le_u16, le_u16, le_u16))(body)?;

        const UNKNOWN_SIZE: u8 = 6;
        let (input, _unknown) = take(UNKNOWN_SIZE)(input)?;
        let (input, earliest_firehose_timestamp) = le_u64(input)?;

        // The subsystem strings offset doubles as the size of the uuid table
        const UUID_SIZE: u16 = 16;
        let uuid_count = usize::from(subsystem_strings_offset / UUID_SIZE);
        let (input, uuids) = many_m_n(uuid_count, uuid_count, extract_uuid)(input)?;

        let strings_size = process_info_offset - subsystem_strings_offset;
        let (input, strings_data) = take(strings_size)(input)?;
        let subsystem_strings = strings_data.to_vec();

        let (input, process_info) = many_m_n(
            usize::from(process_info_count),
            usize::from(process_info_count),
            |data| Self::parse_process_info(data, &uuids),
        )(input)?;

        let (input, sub_chunks) = many_m_n(
            usize::from(sub_chunk_count),
            usize::from(sub_chunk_count),
            Self::parse_sub_chunk,
        )(input)?;

        Ok((
            input,
            CatalogSnapshot {
                uuids,
                subsystem_strings,
                process_info,
                sub_chunks,
                earliest_firehose_timestamp,
            },
        ))
    }

    fn parse_process_info<'a>(
        data: Bytes<'a>,
        uuids: &[String],
    ) -> nom::IResult<Bytes<'a>, ProcessInfo> {
        let (input, (index, _flags, main_uuid_index, dsc_uuid_index)) =
            tuple((le_u16, le_u16, le_u16, le_u16))(data)?;
        let (input, (proc_id_1, proc_id_2)) = tuple((le_u64, le_u32))(input)?;
        let (input, (pid, euid, _unknown, uuids_used_count, _unknown2)) =
            tuple((le_u32, le_u32, le_u32, le_u32, le_u32))(input)?;

        let (input, uuids_used) = many_m_n(
            uuids_used_count as usize,
            uuids_used_count as usize,
            |data| Self::parse_process_uuid_entry(data, uuids),
        )(input)?;

        let (input, (subsystem_count, _unknown3)) = tuple((le_u32, le_u32))(input)?;
        let (input, subsystems) = many_m_n(
            subsystem_count as usize,
            subsystem_count as usize,
            |data| {
                let (input, (identifier, subsystem_offset, category_offset)) =
                    tuple((le_u16, le_u16, le_u16))(data)?;
                Ok((
                    input,
                    SubsystemEntry {
                        identifier,
                        subsystem_offset,
                        category_offset,
                    },
                ))
            },
        )(input)?;

        // Subsystem triples are 6 bytes each; the array pads to 8
        const SUBSYSTEM_SIZE: u64 = 6;
        let padding = padding_size_8(u64::from(subsystem_count) * SUBSYSTEM_SIZE);
        let (input, _) = take(padding)(input)?;

        let main_uuid = uuids
            .get(usize::from(main_uuid_index))
            .cloned()
            .unwrap_or_else(|| {
                warn!("[aulogs] Could not find main UUID in catalog");
                String::new()
            });
        let dsc_uuid = uuids
            .get(usize::from(dsc_uuid_index))
            .cloned()
            .unwrap_or_else(|| {
                warn!("[aulogs] Could not find dsc UUID in catalog");
                String::new()
            });

        Ok((
            input,
            ProcessInfo {
                index,
                main_uuid_index,
                dsc_uuid_index,
                proc_id_1,
                proc_id_2,
                pid,
                euid,
                uuids_used,
                subsystems,
                main_uuid,
                dsc_uuid,
            },
        ))
    }

    fn parse_process_uuid_entry<'a>(
        data: Bytes<'a>,
        uuids: &[String],
    ) -> nom::IResult<Bytes<'a>, ProcessUuidEntry> {
        let (input, (size, _unknown, uuid_index)) = tuple((le_u32, le_u32, le_u16))(data)?;

        // Load addresses are stored as 6 bytes
        const LOAD_ADDRESS_SIZE: u8 = 6;
        let (input, address_bytes) = take(LOAD_ADDRESS_SIZE)(input)?;
        let mut load_address: u64 = 0;
        for (position, byte) in address_bytes.iter().enumerate() {
            load_address |= u64::from(*byte) << (8 * position);
        }

        let uuid = uuids
            .get(usize::from(uuid_index))
            .cloned()
            .ok_or_else(|| nom::Err::Error(make_error(input, ErrorKind::Eof)))?;

        Ok((
            input,
            ProcessUuidEntry {
                size,
                uuid_index,
                load_address,
                uuid,
            },
        ))
    }

    fn parse_sub_chunk(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, CatalogSubChunk> {
        let (input, (start_time, end_time, uncompressed_size, compression_algorithm)) =
            tuple((le_u64, le_u64, le_u32, le_u32))(data)?;

        if compression_algorithm != ALGORITHM_LZ4 {
            return Err(nom::Err::Error(make_error(input, ErrorKind::OneOf)));
        }

        let (input, index_count) = le_u32(input)?;
        let (input, chunk_uuid_indexes) =
            many_m_n(index_count as usize, index_count as usize, le_u16)(input)?;
        let (input, string_count) = le_u32(input)?;
        let (input, string_indexes) =
            many_m_n(string_count as usize, string_count as usize, le_u16)(input)?;

        const OFFSET_SIZE: u64 = 2;
        let padding = padding_size_8(u64::from(index_count + string_count) * OFFSET_SIZE);
        let (input, _) = take(padding)(input)?;

        Ok((
            input,
            CatalogSubChunk {
                start_time,
                end_time,
                uncompressed_size,
                compression_algorithm,
                chunk_uuid_indexes,
                string_indexes,
            },
        ))
    }

    /// Process entry for a firehose page's proc id pair
    pub fn process_info(&self, proc_id_1: u64, proc_id_2: u32) -> Option<&ProcessInfo> {
        self.process_info
            .iter()
            .find(|info| info.proc_id_1 == proc_id_1 && info.proc_id_2 == proc_id_2)
    }

    /// Subsystem and category strings for a subsystem identifier scoped to
    /// a process
    pub fn subsystem(
        &self,
        proc_id_1: u64,
        proc_id_2: u32,
        subsystem_id: u16,
    ) -> Option<(String, String)> {
        let info = self.process_info(proc_id_1, proc_id_2)?;
        let entry = info
            .subsystems
            .iter()
            .find(|entry| entry.identifier == subsystem_id)?;

        let subsystem = self.subsystem_string(entry.subsystem_offset)?;
        let category = self.subsystem_string(entry.category_offset)?;
        Some((subsystem, category))
    }

    fn subsystem_string(&self, offset: u16) -> Option<String> {
        if usize::from(offset) >= self.subsystem_strings.len() {
            warn!("[aulogs] Subsystem string offset beyond the string table");
            return None;
        }
        cstring(&self.subsystem_strings[usize::from(offset)..])
            .map(|(_, value)| value)
            .ok()
    }

    /// Whether any sub-chunk time window covers the timestamp
    pub fn covers(&self, continuous_time: u64) -> bool {
        self.sub_chunks
            .iter()
            .any(|sub| continuous_time >= sub.start_time && continuous_time <= sub.end_time)
    }
}
