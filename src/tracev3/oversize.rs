// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::Bytes;
use crate::tracev3::firehose::args::{parse_args, resolve_private_args, Argument, BacktraceFrame};
use crate::tracev3::firehose::flags::EntryFlags;
use log::{info, warn};
use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32, le_u64, le_u8};
use nom::sequence::tuple;
use std::collections::HashMap;

/// An oversize chunk (tag 0x1002): the out-of-line argument payload for a
/// firehose entry too large to inline. Referenced by
/// `(proc_id_1, proc_id_2, data_ref_index)`
#[derive(Debug, Clone, Default)]
pub struct OversizeChunk {
    pub proc_id_1: u64,
    pub proc_id_2: u32,
    pub ttl: u8,
    pub continuous_time: u64,
    pub data_ref_index: u32,
    pub public_data_size: u16,
    pub private_data_size: u16,
    pub args: Vec<Argument>,
    pub backtrace: Vec<BacktraceFrame>,
}

impl OversizeChunk {
    /// Parse an oversize chunk body (bytes after the chunk envelope)
    pub fn parse(body: Bytes<'_>) -> nom::IResult<Bytes<'_>, OversizeChunk> {
        let (input, (proc_id_1, proc_id_2, ttl)) = tuple((le_u64, le_u32, le_u8))(body)?;
        const RESERVED_SIZE: u8 = 3;
        let (input, _reserved) = take(RESERVED_SIZE)(input)?;
        let (input, (continuous_time, data_ref_index)) = tuple((le_u64, le_u32))(input)?;
        let (input, (public_data_size, private_data_size)) = tuple((le_u16, le_u16))(input)?;

        let mut public_size = usize::from(public_data_size);
        let mut private_size = usize::from(private_data_size);
        if public_size + private_size > input.len() {
            warn!(
                "[aulogs] Oversize data sizes larger than the remaining chunk. Using what is left"
            );
            public_size = input.len().min(public_size);
            private_size = input.len() - public_size;
        }

        let (input, public_data) = take(public_size)(input)?;
        let (input, private_data) = take(private_size)(input)?;

        let (_, mut stream) = parse_args(public_data, EntryFlags::default())?;
        // Oversize private offsets are relative to the private block itself
        resolve_private_args(&mut stream.args, private_data, 0);

        Ok((
            input,
            OversizeChunk {
                proc_id_1,
                proc_id_2,
                ttl,
                continuous_time,
                data_ref_index,
                public_data_size,
                private_data_size,
                args: stream.args,
                backtrace: stream.backtrace,
            },
        ))
    }
}

/// Oversize chunks buffered for the lifetime of one tracev3 file. An entry
/// with a data ref may appear before or after its payload chunk, so lookups
/// are lazy
#[derive(Debug, Clone, Default)]
pub struct OversizeTable {
    chunks: HashMap<(u64, u32, u32), OversizeChunk>,
}

impl OversizeTable {
    pub fn insert(&mut self, chunk: OversizeChunk) {
        self.chunks.insert(
            (chunk.proc_id_1, chunk.proc_id_2, chunk.data_ref_index),
            chunk,
        );
    }

    /// Arguments for a firehose entry's data ref. A miss is reported but
    /// not fatal; the payload may live in a tracev3 file not yet parsed
    pub fn arguments(
        &self,
        proc_id_1: u64,
        proc_id_2: u32,
        data_ref_index: u32,
    ) -> Option<&[Argument]> {
        match self.chunks.get(&(proc_id_1, proc_id_2, data_ref_index)) {
            Some(chunk) => Some(&chunk.args),
            None => {
                info!(
                    "[aulogs] No oversize payload for data ref {data_ref_index} of proc {proc_id_1}:{proc_id_2}"
                );
                None
            }
        }
    }

    /// Fold another table into this one. Payloads for entries in one
    /// tracev3 file regularly live in a later file of the same session
    pub fn merge(&mut self, other: OversizeTable) {
        self.chunks.extend(other.chunks);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }
}
