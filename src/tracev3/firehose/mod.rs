// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! The firehose chunk: the persisted per-process ring of tracepoints.

pub mod activity;
pub mod args;
pub mod flags;
pub mod log;
pub mod loss;
pub mod signpost;
pub mod trace;

use crate::reader::{padding_size_8, Bytes};
use args::{parse_args, resolve_private_args, ArgStream};
use flags::{EntryFlags, FormatSource};
use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32, le_u64, le_u8};
use nom::sequence::tuple;

/// Marks "no private data" in the page header's virtual offset field
pub(crate) const NO_PRIVATE_DATA: u16 = 0x1000;

const ENTRY_HEADER_SIZE: usize = 24;

pub mod activity_type {
    pub const ACTIVITY: u8 = 0x2;
    pub const TRACE: u8 = 0x3;
    pub const LOG: u8 = 0x4;
    pub const SIGNPOST: u8 = 0x6;
    pub const LOSS: u8 = 0x7;
}

/// Optional fields shared by the firehose entry variants, appended to the
/// tracepoint header in canonical flag order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonFields {
    /// The in-scope activity (parent) when the 0x0001 flag is set
    pub current_aid: Option<u64>,
    pub sentinel: Option<u64>,
    pub format_source: FormatSource,
    pub subsystem_id: Option<u16>,
    pub ttl: Option<u8>,
    /// Index into the Oversize table; arguments are out of line
    pub data_ref: Option<u16>,
    pub signpost_name_location: Option<u32>,
    /// `(virtual offset, size)` of this entry's private string window
    pub private_range: Option<(u16, u16)>,
}

impl CommonFields {
    /// Read the flag-driven optional fields in the canonical bitmap order:
    /// current AID, format lookup extras, subsystem, TTL, data ref,
    /// signpost name, private range
    pub(crate) fn parse(data: Bytes<'_>, flags: EntryFlags) -> nom::IResult<Bytes<'_>, Self> {
        let mut fields = CommonFields::default();
        let mut input = data;

        if flags.has_current_aid() {
            let (remaining, (aid, sentinel)) = tuple((le_u64, le_u64))(input)?;
            fields.current_aid = Some(aid);
            fields.sentinel = Some(sentinel);
            input = remaining;
        }

        let (remaining, format_source) = FormatSource::parse(input, flags)?;
        fields.format_source = format_source;
        input = remaining;

        if flags.has_subsystem() {
            let (remaining, subsystem_id) = le_u16(input)?;
            fields.subsystem_id = Some(subsystem_id);
            input = remaining;
        }
        if flags.has_ttl() {
            let (remaining, ttl) = le_u8(input)?;
            fields.ttl = Some(ttl);
            input = remaining;
        }
        if flags.has_data_ref() {
            let (remaining, data_ref) = le_u16(input)?;
            fields.data_ref = Some(data_ref);
            input = remaining;
        }
        if flags.has_signpost_name() {
            let (remaining, location) = le_u32(input)?;
            fields.signpost_name_location = Some(location);
            input = remaining;
        }
        if flags.has_private_data() {
            let (remaining, (offset, size)) = tuple((le_u16, le_u16))(input)?;
            fields.private_range = Some((offset, size));
            input = remaining;
        }

        Ok((input, fields))
    }
}

/// Variant payload of one firehose tracepoint
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Activity(activity::ActivityEntry),
    Trace(trace::TraceEntry),
    Log(log::LogEntry),
    Signpost(signpost::SignpostEntry),
    Loss(loss::LossEntry),
}

impl EntryPayload {
    /// The flag-driven fields, for every variant that has them
    pub fn common(&self) -> Option<&CommonFields> {
        match self {
            EntryPayload::Activity(entry) => Some(&entry.common),
            EntryPayload::Trace(entry) => Some(&entry.common),
            EntryPayload::Log(entry) => Some(&entry.common),
            EntryPayload::Signpost(entry) => Some(&entry.common),
            EntryPayload::Loss(_) => None,
        }
    }
}

/// One decoded firehose tracepoint
#[derive(Debug, Clone, PartialEq)]
pub struct FirehoseEntry {
    pub activity_type: u8,
    pub log_type: u8,
    pub flags: EntryFlags,
    pub format_string_location: u32,
    pub thread_id: u64,
    pub continuous_time_delta: u64,
    pub payload: EntryPayload,
    pub message: ArgStream,
}

impl FirehoseEntry {
    /// Absolute continuous time of the entry
    pub fn continuous_time(&self, base_continuous_time: u64) -> u64 {
        base_continuous_time.saturating_add(self.continuous_time_delta)
    }
}

/// A firehose page: the 32-byte page header plus its run of tracepoints.
/// Entries borrow nothing; the page owns all decoded state
#[derive(Debug, Clone, Default)]
pub struct FirehosePage {
    pub proc_id_1: u64,
    pub proc_id_2: u32,
    pub ttl: u8,
    pub collapsed: u8,
    pub public_data_size: u16,
    pub private_data_virt_offset: u16,
    pub base_continuous_time: u64,
    pub entries: Vec<FirehoseEntry>,
}

impl FirehosePage {
    /// Parse a firehose chunk body (the bytes after the chunk envelope).
    /// Entry-level failures are skipped by their declared size; the page
    /// keeps everything decoded so far
    pub fn parse(body: Bytes<'_>) -> nom::IResult<Bytes<'_>, FirehosePage> {
        let (input, (proc_id_1, proc_id_2, ttl, collapsed, _pad)) =
            tuple((le_u64, le_u32, le_u8, le_u8, le_u16))(body)?;
        let (input, (public_data_size, private_data_virt_offset, _pad2)) =
            tuple((le_u16, le_u16, le_u32))(input)?;
        let (input, base_continuous_time) = le_u64(input)?;

        let mut page = FirehosePage {
            proc_id_1,
            proc_id_2,
            ttl,
            collapsed,
            public_data_size,
            private_data_virt_offset,
            base_continuous_time,
            entries: Vec::new(),
        };

        let (input, public_region) = take(public_data_size)(input)?;

        let mut region = public_region;
        while region.len() >= ENTRY_HEADER_SIZE + 2 {
            match FirehoseEntry::parse(region) {
                Ok((remaining, Some(entry))) => {
                    page.entries.push(entry);
                    region = remaining;
                }
                Ok((remaining, None)) => {
                    // Remnant bytes or an entry skipped after a decode error
                    if remaining.len() == region.len() {
                        break;
                    }
                    region = remaining;
                }
                Err(_) => {
                    ::log::warn!(
                        "[aulogs] Truncated firehose entry in page for proc {}:{}",
                        proc_id_1,
                        proc_id_2
                    );
                    break;
                }
            }
        }

        // The private region grows downward from virtual offset 0x1000 and
        // is stored at the tail of the chunk body
        let input = if private_data_virt_offset != NO_PRIVATE_DATA {
            let region_size = usize::from(NO_PRIVATE_DATA - private_data_virt_offset);
            if input.len() < region_size {
                ::log::warn!("[aulogs] Private data region extends past the firehose chunk");
                input
            } else {
                let private_region = &input[input.len() - region_size..];
                for entry in &mut page.entries {
                    resolve_private_args(
                        &mut entry.message.args,
                        private_region,
                        private_data_virt_offset,
                    );
                }
                &[]
            }
        } else {
            input
        };

        Ok((input, page))
    }

}

impl FirehoseEntry {
    /// Parse one tracepoint. `Ok(None)` signals remnant data (activity type
    /// 0) or an entry that was skipped after an interior decode error; the
    /// returned slice always advances past the entry's declared size
    fn parse(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, Option<FirehoseEntry>> {
        let (input, activity_type) = le_u8(data)?;

        // Zeroed remnant space at the end of the page
        if activity_type == 0 {
            return Ok((data, None));
        }

        let (input, (log_type, raw_flags, format_string_location)) =
            tuple((le_u8, le_u16, le_u32))(input)?;
        let (input, (thread_id, continuous_time_delta)) = tuple((le_u64, le_u64))(input)?;
        let (input, payload_size) = le_u16(input)?;
        let (input, payload) = take(payload_size)(input)?;

        // Entries are 8-byte aligned within the page
        let padding = padding_size_8((ENTRY_HEADER_SIZE + 2 + usize::from(payload_size)) as u64);
        let after_entry = if input.len() >= padding as usize {
            &input[padding as usize..]
        } else {
            &input[input.len()..]
        };

        let flags = EntryFlags(raw_flags);
        let decoded = FirehoseEntry::decode_payload(activity_type, log_type, flags, payload);
        let (payload_value, message) = match decoded {
            Ok(value) => value,
            Err(err) => {
                ::log::warn!(
                    "[aulogs] Skipping firehose entry (activity type {:#x}): {err:?}",
                    activity_type
                );
                return Ok((after_entry, None));
            }
        };

        Ok((
            after_entry,
            Some(FirehoseEntry {
                activity_type,
                log_type,
                flags,
                format_string_location,
                thread_id,
                continuous_time_delta,
                payload: payload_value,
                message,
            }),
        ))
    }

    fn decode_payload<'a>(
        activity_type: u8,
        log_type: u8,
        flags: EntryFlags,
        payload: Bytes<'a>,
    ) -> Result<(EntryPayload, ArgStream), nom::Err<nom::error::Error<Bytes<'a>>>> {
        let (rest, payload_value) = match activity_type {
            activity_type::ACTIVITY => {
                let (rest, entry) = activity::ActivityEntry::parse(payload, flags, log_type)?;
                (rest, EntryPayload::Activity(entry))
            }
            activity_type::TRACE => {
                let (rest, entry) = trace::TraceEntry::parse(payload, flags)?;
                (rest, EntryPayload::Trace(entry))
            }
            activity_type::LOG => {
                let (rest, entry) = log::LogEntry::parse(payload, flags)?;
                (rest, EntryPayload::Log(entry))
            }
            activity_type::SIGNPOST => {
                let (rest, entry) = signpost::SignpostEntry::parse(payload, flags)?;
                (rest, EntryPayload::Signpost(entry))
            }
            activity_type::LOSS => {
                let (rest, entry) = loss::LossEntry::parse(payload)?;
                (rest, EntryPayload::Loss(entry))
            }
            unknown => {
                ::log::warn!("[aulogs] Unknown firehose activity type: {unknown:#x}");
                return Err(nom::Err::Incomplete(nom::Needed::Unknown));
            }
        };

        // Loss entries carry no message; everything else may have a typed
        // argument stream
        let message = if matches!(payload_value, EntryPayload::Loss(_)) || rest.len() < 2 {
            ArgStream::default()
        } else {
            let (_, stream) = parse_args(rest, flags)?;
            stream
        };

        Ok((payload_value, message))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::args::ArgValue;
    use super::*;

    /// Encode one firehose entry in wire layout
    pub(crate) fn test_entry_bytes(
        activity_type: u8,
        log_type: u8,
        flags: u16,
        fmt_location: u32,
        thread_id: u64,
        delta: u64,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        data.push(activity_type);
        data.push(log_type);
        data.extend_from_slice(&flags.to_le_bytes());
        data.extend_from_slice(&fmt_location.to_le_bytes());
        data.extend_from_slice(&thread_id.to_le_bytes());
        data.extend_from_slice(&delta.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(payload);
        let padding = padding_size_8((26 + payload.len()) as u64);
        data.extend(std::iter::repeat(0).take(padding as usize));
        data
    }

    /// Encode a firehose page body (no chunk envelope)
    pub(crate) fn test_page_bytes(
        proc_id_1: u64,
        proc_id_2: u32,
        base_time: u64,
        entries: &[Vec<u8>],
        private_region: Option<&[u8]>,
    ) -> Vec<u8> {
        let public: Vec<u8> = entries.iter().flatten().copied().collect();
        let virt_offset = match private_region {
            Some(region) => NO_PRIVATE_DATA - region.len() as u16,
            None => NO_PRIVATE_DATA,
        };

        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(&proc_id_1.to_le_bytes());
        data.extend_from_slice(&proc_id_2.to_le_bytes());
        data.push(0); // ttl
        data.push(0); // collapsed
        data.extend_from_slice(&0_u16.to_le_bytes());
        data.extend_from_slice(&(public.len() as u16).to_le_bytes());
        data.extend_from_slice(&virt_offset.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&base_time.to_le_bytes());
        data.extend_from_slice(&public);
        if let Some(region) = private_region {
            data.extend_from_slice(region);
        }
        data
    }

    #[test]
    fn test_parse_page_with_log_entry() {
        let arg_stream = super::args::tests::test_arg_stream(&[(0x00, &7_u32.to_le_bytes())], &[]);
        let entry = test_entry_bytes(0x4, 0x0, 0x2, 0x100, 0x1234, 1000, &arg_stream);
        let body = test_page_bytes(163, 4, 0, &[entry], None);

        let (_, page) = FirehosePage::parse(&body).unwrap();
        assert_eq!(page.proc_id_1, 163);
        assert_eq!(page.proc_id_2, 4);
        assert_eq!(page.base_continuous_time, 0);
        assert_eq!(page.entries.len(), 1);

        let entry = &page.entries[0];
        assert_eq!(entry.activity_type, 0x4);
        assert_eq!(entry.log_type, 0x0);
        assert_eq!(entry.thread_id, 0x1234);
        assert_eq!(entry.continuous_time_delta, 1000);
        assert_eq!(entry.format_string_location, 0x100);
        assert_eq!(entry.message.args.len(), 1);
        assert_eq!(entry.message.args[0].as_u64(), Some(7));
        assert!(matches!(entry.payload, EntryPayload::Log(_)));
    }

    #[test]
    fn test_parse_page_multiple_entries() {
        let first = test_entry_bytes(0x4, 0x0, 0x2, 0x100, 1, 10, &[]);
        let second = test_entry_bytes(0x4, 0x10, 0x2, 0x109, 2, 20, &[]);
        let body = test_page_bytes(1, 1, 500, &[first, second], None);

        let (_, page) = FirehosePage::parse(&body).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].continuous_time(page.base_continuous_time), 510);
        assert_eq!(page.entries[1].continuous_time(page.base_continuous_time), 520);
        assert_eq!(page.entries[1].log_type, 0x10);
    }

    #[test]
    fn test_parse_page_private_data() {
        // One private string argument referencing the private region
        let virt_offset: u16 = NO_PRIVATE_DATA - 8;
        let mut private_ref = Vec::new();
        private_ref.extend_from_slice(&virt_offset.to_le_bytes());
        private_ref.extend_from_slice(&6_u16.to_le_bytes());
        let arg_stream = super::args::tests::test_arg_stream(&[(0x31, &private_ref)], &[]);

        // Private range field from flag 0x400 precedes the args
        let mut payload = Vec::new();
        payload.extend_from_slice(&virt_offset.to_le_bytes());
        payload.extend_from_slice(&6_u16.to_le_bytes());
        payload.extend_from_slice(&arg_stream);

        let entry = test_entry_bytes(0x4, 0x0, 0x2 | 0x400, 0x100, 1, 0, &payload);
        let body = test_page_bytes(1, 1, 0, &[entry], Some(b"secret\0\0"));

        let (_, page) = FirehosePage::parse(&body).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(
            page.entries[0].message.args[0].value,
            ArgValue::Text(String::from("secret"))
        );
    }

    #[test]
    fn test_parse_page_stops_at_remnant() {
        let entry = test_entry_bytes(0x4, 0x0, 0x2, 0x100, 1, 0, &[]);
        let mut entries = vec![entry];
        entries.push(vec![0_u8; 32]); // zeroed remnant space
        let body = test_page_bytes(1, 1, 0, &entries, None);

        let (_, page) = FirehosePage::parse(&body).unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[test]
    fn test_parse_loss_entry() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&10_u64.to_le_bytes());
        payload.extend_from_slice(&20_u64.to_le_bytes());
        payload.extend_from_slice(&3_u64.to_le_bytes());
        let entry = test_entry_bytes(0x7, 0x0, 0x0, 0, 0, 0, &payload);
        let body = test_page_bytes(1, 1, 0, &[entry], None);

        let (_, page) = FirehosePage::parse(&body).unwrap();
        assert_eq!(page.entries.len(), 1);
        match &page.entries[0].payload {
            EntryPayload::Loss(loss) => {
                assert_eq!(loss.start_time, 10);
                assert_eq!(loss.end_time, 20);
                assert_eq!(loss.count, 3);
            }
            other => panic!("expected loss payload, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_entry_skipped_page_continues() {
        // Unknown format lookup method (0x6) makes the first entry
        // undecodable; the second entry still parses
        let bad = test_entry_bytes(0x4, 0x0, 0x6, 0x100, 1, 0, &[]);
        let good = test_entry_bytes(0x4, 0x0, 0x2, 0x109, 2, 0, &[]);
        let body = test_page_bytes(1, 1, 0, &[bad, good], None);

        let (_, page) = FirehosePage::parse(&body).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].thread_id, 2);
    }
}
