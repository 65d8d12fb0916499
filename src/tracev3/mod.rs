// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! The tracev3 container: a sequence of typed, 8-byte aligned chunks, with
//! the bulk of the log data LZ4-compressed inside ChunkSet chunks.

pub mod catalog;
pub mod chunkset;
pub mod firehose;
pub mod header;
pub mod oversize;
pub mod simpledump;
pub mod statedump;

use crate::error::LogError;
use crate::reader::padding_size_8;
use catalog::CatalogSnapshot;
use firehose::FirehosePage;
use header::TraceContext;
use log::{error, warn};
use nom::number::complete::{le_u32, le_u64};
use nom::sequence::tuple;
use oversize::{OversizeChunk, OversizeTable};
use simpledump::Simpledump;
use statedump::Statedump;

/// Chunk tags of the tracev3 container
pub mod tags {
    pub const HEADER: u32 = 0x1000;
    pub const FIREHOSE: u32 = 0x1001;
    pub const OVERSIZE: u32 = 0x1002;
    pub const STATEDUMP: u32 = 0x1003;
    pub const SIMPLEDUMP: u32 = 0x1004;
    pub const CATALOG: u32 = 0x600b;
    pub const CHUNKSET: u32 = 0x600d;
}

const ENVELOPE_SIZE: usize = 16;

/// The 16-byte envelope in front of every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEnvelope {
    pub tag: u32,
    pub subtag: u32,
    pub data_size: u64,
}

impl ChunkEnvelope {
    pub fn parse(input: &[u8]) -> nom::IResult<&[u8], ChunkEnvelope> {
        let (input, (tag, subtag, data_size)) = tuple((le_u32, le_u32, le_u64))(input)?;
        Ok((
            input,
            ChunkEnvelope {
                tag,
                subtag,
                data_size,
            },
        ))
    }
}

/// All chunks decoded between two catalog chunks, interpreted against the
/// snapshot that opened the block. Entries seen before any catalog land in
/// a block without a snapshot and get placeholder process info
#[derive(Debug, Clone, Default)]
pub struct CatalogBlock {
    pub snapshot: Option<CatalogSnapshot>,
    pub firehose: Vec<FirehosePage>,
    pub simpledump: Vec<Simpledump>,
    pub statedump: Vec<Statedump>,
}

impl CatalogBlock {
    fn is_empty(&self) -> bool {
        self.snapshot.is_none()
            && self.firehose.is_empty()
            && self.simpledump.is_empty()
            && self.statedump.is_empty()
    }
}

/// A decoded tracev3 file (or one iterator step of it): the header context,
/// the catalog blocks, the oversize payloads seen so far, and the
/// non-fatal errors recovered along the way
#[derive(Debug, Clone, Default)]
pub struct TraceData {
    pub context: Option<TraceContext>,
    pub blocks: Vec<CatalogBlock>,
    pub oversize: OversizeTable,
    /// Chunk-level failures that were skipped (LZ4 damage, truncation).
    /// Records decoded before a failure stay valid
    pub diagnostics: Vec<LogError>,
}

impl TraceData {
    /// Decode a whole tracev3 buffer. The file must open with a header
    /// chunk; anything else is a fatal `BadMagic`. Later damage is
    /// recovered by skipping chunks, keeping everything decoded so far
    pub fn parse(data: &[u8]) -> Result<TraceData, LogError> {
        let Ok((_, envelope)) = ChunkEnvelope::parse(data) else {
            return Err(LogError::Truncated {
                offset: 0,
                chunk_tag: 0,
            });
        };
        if envelope.tag != tags::HEADER {
            return Err(LogError::BadMagic {
                expected: tags::HEADER,
                got: envelope.tag,
                offset: 0,
            });
        }

        let mut trace = TraceData::default();
        let mut iterator = TraceIterator::new(data.to_vec());
        for mut step in &mut iterator {
            if step.context.is_some() {
                trace.context = step.context.take();
            }
            trace.blocks.append(&mut step.blocks);
            trace.oversize.merge(step.oversize);
            trace.diagnostics.append(&mut step.diagnostics);
        }
        Ok(trace)
    }
}

/// Streams a tracev3 buffer one catalog block at a time, bounding memory
/// by the largest ChunkSet. Each yielded `TraceData` carries at most one
/// block; oversize payloads accumulate into the step they were seen in
#[derive(Debug, Clone)]
pub struct TraceIterator {
    pub data: Vec<u8>,
    offset: usize,
    context: Option<TraceContext>,
}

impl TraceIterator {
    pub fn new(data: Vec<u8>) -> Self {
        TraceIterator {
            data,
            offset: 0,
            context: None,
        }
    }
}

impl Iterator for TraceIterator {
    type Item = TraceData;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let mut block = CatalogBlock::default();
        let mut oversize = OversizeTable::default();
        let mut diagnostics: Vec<LogError> = Vec::new();
        let mut yielded_context = None;

        loop {
            let remaining = &self.data[self.offset..];
            if remaining.len() < ENVELOPE_SIZE {
                if !remaining.is_empty() {
                    warn!(
                        "[aulogs] Not enough data for a chunk envelope, needed 16 bytes. Got: {}",
                        remaining.len()
                    );
                }
                self.offset = self.data.len();
                break;
            }

            let Ok((body_start, envelope)) = ChunkEnvelope::parse(remaining) else {
                self.offset = self.data.len();
                break;
            };

            let body_len = envelope.data_size as usize;
            if body_start.len() < body_len {
                warn!(
                    "[aulogs] Truncated chunk {:#x} at offset {}: need {} bytes, have {}",
                    envelope.tag,
                    self.offset,
                    body_len,
                    body_start.len()
                );
                diagnostics.push(LogError::Truncated {
                    offset: self.offset,
                    chunk_tag: envelope.tag,
                });
                self.offset = self.data.len();
                break;
            }
            let body = &body_start[..body_len];

            // A second catalog closes the current block; leave it for the
            // next iterator step
            if envelope.tag == tags::CATALOG && !block.is_empty() {
                break;
            }

            let consumed = ENVELOPE_SIZE
                + body_len
                + padding_size_8(envelope.data_size) as usize;
            self.offset = (self.offset + consumed).min(self.data.len());

            match envelope.tag {
                tags::HEADER => match TraceContext::parse(body) {
                    Ok((_, context)) => {
                        yielded_context = Some(context.clone());
                        self.context = Some(context);
                    }
                    Err(err) => error!("[aulogs] Failed to parse header chunk: {err:?}"),
                },
                tags::CATALOG => match CatalogSnapshot::parse(body) {
                    Ok((_, snapshot)) => block.snapshot = Some(snapshot),
                    Err(err) => error!("[aulogs] Failed to parse catalog chunk: {err:?}"),
                },
                tags::CHUNKSET => {
                    match chunkset::decompress_chunkset(envelope.subtag, body) {
                        Ok(inflated) => {
                            route_inner_chunks(&inflated, &mut block, &mut oversize);
                        }
                        Err(err) => {
                            // Fatal for this ChunkSet only
                            error!("[aulogs] {err}");
                            diagnostics.push(err);
                        }
                    }
                }
                other => {
                    route_data_chunk(other, body, &mut block, &mut oversize);
                }
            }

            if self.offset >= self.data.len() {
                break;
            }
        }

        if block.is_empty()
            && oversize.is_empty()
            && diagnostics.is_empty()
            && yielded_context.is_none()
        {
            return None;
        }

        let blocks = if block.is_empty() { Vec::new() } else { vec![block] };
        Some(TraceData {
            context: yielded_context.or_else(|| self.context.clone()),
            blocks,
            oversize,
            diagnostics,
        })
    }
}

/// Walk the inflated ChunkSet buffer as a run of inner chunks
fn route_inner_chunks(data: &[u8], block: &mut CatalogBlock, oversize: &mut OversizeTable) {
    let mut input = data;
    while input.len() >= ENVELOPE_SIZE {
        let Ok((body_start, envelope)) = ChunkEnvelope::parse(input) else {
            break;
        };
        let body_len = envelope.data_size as usize;
        if body_start.len() < body_len {
            warn!(
                "[aulogs] Truncated inner chunk {:#x}: need {} bytes, have {}",
                envelope.tag,
                body_len,
                body_start.len()
            );
            break;
        }
        let body = &body_start[..body_len];

        match envelope.tag {
            tags::CHUNKSET => {
                warn!("[aulogs] Nested ChunkSet chunk skipped");
            }
            tags::CATALOG => {
                // Catalogs normally live at the outer level. Accept one
                // that opens an empty block, skip otherwise
                if block.is_empty() {
                    if let Ok((_, snapshot)) = CatalogSnapshot::parse(body) {
                        block.snapshot = Some(snapshot);
                    }
                } else {
                    warn!("[aulogs] Catalog chunk inside a ChunkSet skipped");
                }
            }
            other => route_data_chunk(other, body, block, oversize),
        }

        let advance = ENVELOPE_SIZE + body_len + padding_size_8(envelope.data_size) as usize;
        if advance >= input.len() {
            break;
        }
        input = &input[advance..];
    }
}

fn route_data_chunk(tag: u32, body: &[u8], block: &mut CatalogBlock, oversize: &mut OversizeTable) {
    match tag {
        tags::FIREHOSE => match FirehosePage::parse(body) {
            Ok((_, page)) => block.firehose.push(page),
            Err(err) => error!("[aulogs] Failed to parse firehose chunk: {err:?}"),
        },
        tags::OVERSIZE => match OversizeChunk::parse(body) {
            Ok((_, chunk)) => oversize.insert(chunk),
            Err(err) => error!("[aulogs] Failed to parse oversize chunk: {err:?}"),
        },
        tags::STATEDUMP => match Statedump::parse(body) {
            Ok((_, statedump)) => block.statedump.push(statedump),
            Err(err) => error!("[aulogs] Failed to parse statedump chunk: {err:?}"),
        },
        tags::SIMPLEDUMP => match Simpledump::parse(body) {
            Ok((_, simpledump)) => block.simpledump.push(simpledump),
            Err(err) => error!("[aulogs] Failed to parse simpledump chunk: {err:?}"),
        },
        unknown => {
            warn!("[aulogs] Unknown chunk tag skipped: {unknown:#x}");
        }
    }
}
