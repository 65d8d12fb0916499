// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{extract_string_size, extract_uuid, padding_size_4, Bytes};
use crate::tracev3::firehose::flags::EntryFlags;
use log::{debug, warn};
use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::sequence::tuple;
use nom::Needed;
use serde::Serialize;

/// Privacy class of one argument, derived from its wire descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArgPrivacy {
    Public,
    /// Redacted unless the format specifier says `%{public}`
    Private,
    /// Always redacted regardless of format hints
    Sensitive,
}

/// Decoded payload of one typed argument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArgValue {
    /// Raw little-endian integer of the given wire width (also carries
    /// float bits for `%f`-family conversions)
    Scalar { raw: u64, width: u8 },
    /// A string resolved from the public data region
    Text(String),
    /// Raw object bytes for `%P`/`%@` decoders
    Bytes(Vec<u8>),
    /// Reference into the page's private region, resolved after the public
    /// data has been walked
    PrivateRef { offset: u16, size: u16 },
    /// Nothing available (redacted or absent)
    Missing,
}

/// One argument from a firehose entry's typed argument stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    pub value: ArgValue,
    pub privacy: ArgPrivacy,
    pub descriptor: u8,
}

/// One frame of an activity context (backtrace) blob
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktraceFrame {
    pub uuid: String,
    pub offset: u32,
}

/// The decoded argument stream of one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArgStream {
    pub args: Vec<Argument>,
    pub backtrace: Vec<BacktraceFrame>,
}

impl Argument {
    pub(crate) fn scalar(raw: u64, width: u8, privacy: ArgPrivacy, descriptor: u8) -> Self {
        Argument {
            value: ArgValue::Scalar { raw, width },
            privacy,
            descriptor,
        }
    }

    /// Unsigned view of a scalar, masked to its wire width
    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            ArgValue::Scalar { raw, width } => Some(mask_to_width(raw, width)),
            _ => None,
        }
    }

    /// Signed view of a scalar, sign-extended from its wire width
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            ArgValue::Scalar { raw, width } => {
                let masked = mask_to_width(raw, width);
                let bytes = masked.to_le_bytes();
                let value = match width {
                    1 => i64::from(i8::from_le_bytes([bytes[0]])),
                    2 => i64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
                    4 => i64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
                    _ => i64::from_le_bytes(bytes),
                };
                Some(value)
            }
            _ => None,
        }
    }

    /// Float view: 8-byte scalars are f64 bits, 4-byte scalars f32 bits
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            ArgValue::Scalar { raw, width } => match width {
                4 => Some(f64::from(f32::from_bits(raw as u32))),
                _ => Some(f64::from_bits(raw)),
            },
            _ => None,
        }
    }
}

fn mask_to_width(raw: u64, width: u8) -> u64 {
    match width {
        1 => raw & 0xff,
        2 => raw & 0xffff,
        4 => raw & 0xffff_ffff,
        _ => raw,
    }
}

// Descriptor high nibbles
const KIND_SCALAR: u8 = 0x0;
const KIND_PRIVATE_SCALAR: u8 = 0x1;
const KIND_PUBLIC_STRING: u8 = 0x2;
const KIND_PRIVATE_STRING: u8 = 0x3;
const KIND_OBJECT: u8 = 0x4;
const KIND_ARRAY: u8 = 0x5;
const KIND_SENSITIVE: u8 = 0x8;

struct RawItem {
    descriptor: u8,
    size: u8,
    data: Vec<u8>,
}

/// Parse the typed argument stream of a log/trace/signpost entry: a 1-byte
/// unknown, the item count, the items, an optional backtrace blob, and the
/// trailing string area the string items point into
pub(crate) fn parse_args(data: Bytes<'_>, flags: EntryFlags) -> nom::IResult<Bytes<'_>, ArgStream> {
    let (input, (_unknown, item_count)) = tuple((le_u8, le_u8))(data)?;

    let mut items: Vec<RawItem> = Vec::new();
    let mut input = input;
    for _ in 0..item_count {
        let (remaining, (descriptor, size)) = tuple((le_u8, le_u8))(input)?;
        let (remaining, item_data) = take(size)(remaining)?;
        items.push(RawItem {
            descriptor,
            size,
            data: item_data.to_vec(),
        });
        input = remaining;
    }

    let mut stream = ArgStream::default();

    // Backtrace data sits between the item descriptors and the argument
    // strings. Oversize payloads lack the context flag, so also probe for
    // the blob signature
    const BACKTRACE_SIGNATURE: [u8; 3] = [0x01, 0x00, 0x12];
    if flags.has_context_data() {
        debug!("[aulogs] Firehose entry carries an activity context blob");
        let (remaining, backtrace) = parse_backtrace(input)?;
        stream.backtrace = backtrace;
        input = remaining;
    } else if input.len() > BACKTRACE_SIGNATURE.len() && input[..3] == BACKTRACE_SIGNATURE {
        let (remaining, backtrace) = parse_backtrace(input)?;
        stream.backtrace = backtrace;
        input = remaining;
    }

    // Everything after the items (and backtrace) is the string area the
    // reference items index into
    let string_area = input;

    for item in &items {
        let argument = decode_item(item, string_area)?;
        stream.args.push(argument);
    }

    Ok((&[], stream))
}

fn decode_item<'a>(item: &RawItem, string_area: Bytes<'a>) -> Result<Argument, nom::Err<nom::error::Error<Bytes<'a>>>> {
    let kind = item.descriptor >> 4;
    match kind {
        KIND_SCALAR => Ok(Argument::scalar(
            scalar_value(&item.data, item.size),
            item.size,
            ArgPrivacy::Public,
            item.descriptor,
        )),
        KIND_PRIVATE_SCALAR => {
            if item.size == 0 {
                Ok(Argument {
                    value: ArgValue::Missing,
                    privacy: ArgPrivacy::Private,
                    descriptor: item.descriptor,
                })
            } else {
                Ok(Argument::scalar(
                    scalar_value(&item.data, item.size),
                    item.size,
                    ArgPrivacy::Private,
                    item.descriptor,
                ))
            }
        }
        KIND_PUBLIC_STRING => {
            let (offset, size) = string_ref(&item.data);
            let value = read_string_ref(string_area, offset, size);
            Ok(Argument {
                value,
                privacy: ArgPrivacy::Public,
                descriptor: item.descriptor,
            })
        }
        KIND_PRIVATE_STRING => {
            let (offset, size) = string_ref(&item.data);
            let value = if size == 0 {
                ArgValue::Missing
            } else {
                ArgValue::PrivateRef { offset, size }
            };
            Ok(Argument {
                value,
                privacy: ArgPrivacy::Private,
                descriptor: item.descriptor,
            })
        }
        KIND_OBJECT => {
            let (offset, size) = string_ref(&item.data);
            let value = read_object_ref(string_area, offset, size);
            Ok(Argument {
                value,
                privacy: ArgPrivacy::Public,
                descriptor: item.descriptor,
            })
        }
        KIND_ARRAY => Ok(Argument {
            value: ArgValue::Bytes(item.data.clone()),
            privacy: ArgPrivacy::Public,
            descriptor: item.descriptor,
        }),
        KIND_SENSITIVE => Ok(Argument {
            value: ArgValue::Missing,
            privacy: ArgPrivacy::Sensitive,
            descriptor: item.descriptor,
        }),
        _ => {
            warn!(
                "[aulogs] Unknown firehose argument descriptor: {:#x}",
                item.descriptor
            );
            Err(nom::Err::Incomplete(Needed::Unknown))
        }
    }
}

fn scalar_value(data: &[u8], width: u8) -> u64 {
    let mut raw: u64 = 0;
    match width {
        1 | 2 | 4 | 8 => {
            for (index, byte) in data.iter().take(usize::from(width)).enumerate() {
                raw |= u64::from(*byte) << (8 * index);
            }
        }
        _ => {
            warn!("[aulogs] Unknown scalar argument width: {width}");
        }
    }
    raw
}

// String and object item data is a 2-byte offset into the string area plus
// a 2-byte size
fn string_ref(data: &[u8]) -> (u16, u16) {
    if data.len() < 4 {
        return (0, 0);
    }
    let offset = u16::from_le_bytes([data[0], data[1]]);
    let size = u16::from_le_bytes([data[2], data[3]]);
    (offset, size)
}

fn read_string_ref(string_area: Bytes<'_>, offset: u16, size: u16) -> ArgValue {
    if size == 0 {
        return ArgValue::Text(String::from("(null)"));
    }
    if usize::from(offset) >= string_area.len() {
        warn!("[aulogs] String argument offset {offset} beyond the string area");
        return ArgValue::Missing;
    }
    match extract_string_size(&string_area[usize::from(offset)..], u64::from(size)) {
        Ok((_, value)) => ArgValue::Text(value),
        Err(_) => ArgValue::Missing,
    }
}

fn read_object_ref(string_area: Bytes<'_>, offset: u16, size: u16) -> ArgValue {
    if size == 0 {
        return ArgValue::Text(String::from("(null)"));
    }
    let start = usize::from(offset);
    let end = start + usize::from(size);
    if end > string_area.len() {
        warn!("[aulogs] Object argument reference beyond the string area");
        return ArgValue::Missing;
    }
    ArgValue::Bytes(string_area[start..end].to_vec())
}

/// Resolve private string references against the page's private region.
/// Offsets are virtual; physical position is `offset - virt_offset`. A
/// reference past the region is treated as a miss
pub(crate) fn resolve_private_args(args: &mut [Argument], private_region: &[u8], virt_offset: u16) {
    for argument in args {
        let ArgValue::PrivateRef { offset, size } = argument.value else {
            continue;
        };
        let Some(start) = offset.checked_sub(virt_offset) else {
            warn!("[aulogs] Private string offset {offset:#x} below the private region");
            argument.value = ArgValue::Missing;
            continue;
        };
        if usize::from(start) >= private_region.len() {
            warn!("[aulogs] Private string offset {offset:#x} past the page end");
            argument.value = ArgValue::Missing;
            continue;
        }
        match extract_string_size(&private_region[usize::from(start)..], u64::from(size)) {
            Ok((_, value)) => argument.value = ArgValue::Text(value),
            Err(_) => argument.value = ArgValue::Missing,
        }
    }
}

// Activity context blob: uuid table, offset table, then a uuid index per
// offset, padded to 4 bytes
fn parse_backtrace(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, Vec<BacktraceFrame>> {
    let (input, (_unknown, _unknown2, uuid_count, offset_count)) =
        tuple((le_u16, le_u8, le_u8, le_u16))(data)?;

    let mut uuids: Vec<String> = Vec::new();
    let mut input = input;
    for _ in 0..uuid_count {
        let (remaining, uuid) = extract_uuid(input)?;
        uuids.push(uuid);
        input = remaining;
    }

    let mut offsets: Vec<u32> = Vec::new();
    for _ in 0..offset_count {
        let (remaining, offset) = le_u32(input)?;
        offsets.push(offset);
        input = remaining;
    }

    let mut frames: Vec<BacktraceFrame> = Vec::new();
    for offset in offsets {
        let (remaining, uuid_index) = le_u8(input)?;
        input = remaining;
        let uuid = uuids
            .get(usize::from(uuid_index))
            .cloned()
            .unwrap_or_else(|| String::from("00000000000000000000000000000000"));
        frames.push(BacktraceFrame { uuid, offset });
    }

    let padding = padding_size_4(u64::from(offset_count));
    let (input, _) = take(padding)(input)?;
    Ok((input, frames))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tracev3::firehose::flags::EntryFlags;

    /// Build an argument stream: unknown byte, count, items, string area
    pub(crate) fn test_arg_stream(items: &[(u8, &[u8])], string_area: &[u8]) -> Vec<u8> {
        let mut data: Vec<u8> = vec![0, items.len() as u8];
        for (descriptor, item_data) in items {
            data.push(*descriptor);
            data.push(item_data.len() as u8);
            data.extend_from_slice(item_data);
        }
        data.extend_from_slice(string_area);
        data
    }

    #[test]
    fn test_parse_scalar_args() {
        let data = test_arg_stream(
            &[(0x00, &7_u32.to_le_bytes()), (0x00, &(-3_i64).to_le_bytes())],
            &[],
        );
        let (_, stream) = parse_args(&data, EntryFlags(0x2)).unwrap();
        assert_eq!(stream.args.len(), 2);
        assert_eq!(stream.args[0].as_u64(), Some(7));
        assert_eq!(stream.args[0].privacy, ArgPrivacy::Public);
        assert_eq!(stream.args[1].as_i64(), Some(-3));
    }

    #[test]
    fn test_parse_string_arg() {
        // Offset 0, size 8 into the trailing string area
        let mut item = Vec::new();
        item.extend_from_slice(&0_u16.to_le_bytes());
        item.extend_from_slice(&8_u16.to_le_bytes());
        let data = test_arg_stream(&[(0x20, &item)], b"payload\0");
        let (_, stream) = parse_args(&data, EntryFlags(0x2)).unwrap();
        assert_eq!(
            stream.args[0].value,
            ArgValue::Text(String::from("payload"))
        );
    }

    #[test]
    fn test_parse_null_string_arg() {
        let mut item = Vec::new();
        item.extend_from_slice(&0_u16.to_le_bytes());
        item.extend_from_slice(&0_u16.to_le_bytes());
        let data = test_arg_stream(&[(0x20, &item)], &[]);
        let (_, stream) = parse_args(&data, EntryFlags(0x2)).unwrap();
        assert_eq!(stream.args[0].value, ArgValue::Text(String::from("(null)")));
    }

    #[test]
    fn test_parse_private_and_sensitive_args() {
        let mut private_ref = Vec::new();
        private_ref.extend_from_slice(&0x1000_u16.to_le_bytes());
        private_ref.extend_from_slice(&6_u16.to_le_bytes());
        let data = test_arg_stream(
            &[
                (0x10, &5_u32.to_le_bytes()),
                (0x31, &private_ref),
                (0x80, &[]),
            ],
            &[],
        );
        let (_, stream) = parse_args(&data, EntryFlags(0x2)).unwrap();
        assert_eq!(stream.args[0].privacy, ArgPrivacy::Private);
        assert_eq!(stream.args[0].as_u64(), Some(5));
        assert_eq!(
            stream.args[1].value,
            ArgValue::PrivateRef {
                offset: 0x1000,
                size: 6
            }
        );
        assert_eq!(stream.args[2].privacy, ArgPrivacy::Sensitive);
        assert_eq!(stream.args[2].value, ArgValue::Missing);
    }

    #[test]
    fn test_parse_object_arg() {
        let mut item = Vec::new();
        item.extend_from_slice(&0_u16.to_le_bytes());
        item.extend_from_slice(&16_u16.to_le_bytes());
        let uuid_bytes = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ];
        let data = test_arg_stream(&[(0x40, &item)], &uuid_bytes);
        let (_, stream) = parse_args(&data, EntryFlags(0x2)).unwrap();
        assert_eq!(stream.args[0].value, ArgValue::Bytes(uuid_bytes.to_vec()));
    }

    #[test]
    fn test_bad_descriptor() {
        let data = test_arg_stream(&[(0x70, &[0, 0, 0, 0])], &[]);
        assert!(parse_args(&data, EntryFlags(0x2)).is_err());
    }

    #[test]
    fn test_resolve_private_args() {
        let mut args = vec![Argument {
            value: ArgValue::PrivateRef {
                offset: 0x1002,
                size: 3,
            },
            privacy: ArgPrivacy::Private,
            descriptor: 0x31,
        }];
        let region = b"..abc.";
        resolve_private_args(&mut args, region, 0x1000);
        assert_eq!(args[0].value, ArgValue::Text(String::from("abc")));
        assert_eq!(args[0].privacy, ArgPrivacy::Private);
    }

    #[test]
    fn test_resolve_private_args_past_page_end() {
        let mut args = vec![Argument {
            value: ArgValue::PrivateRef {
                offset: 0x2000,
                size: 4,
            },
            privacy: ArgPrivacy::Private,
            descriptor: 0x31,
        }];
        resolve_private_args(&mut args, b"ab", 0x1000);
        assert_eq!(args[0].value, ArgValue::Missing);
    }

    #[test]
    fn test_parse_backtrace_blob() {
        let mut data = vec![0, 2]; // unknown + item count 0? -> actually build full stream below
        data.clear();
        // Stream with zero items and a context blob
        data.push(0);
        data.push(0);
        // Blob: unknown u16, unknown u8, uuid count, offset count
        data.extend_from_slice(&0_u16.to_le_bytes());
        data.push(0);
        data.push(1);
        data.extend_from_slice(&2_u16.to_le_bytes());
        data.extend_from_slice(&[
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ]);
        data.extend_from_slice(&0x100_u32.to_le_bytes());
        data.extend_from_slice(&0x200_u32.to_le_bytes());
        data.push(0);
        data.push(0);
        data.extend_from_slice(&[0, 0]); // pad to 4

        let (_, stream) = parse_args(&data, EntryFlags(0x2 | 0x1000)).unwrap();
        assert_eq!(stream.backtrace.len(), 2);
        assert_eq!(
            stream.backtrace[0].uuid,
            "00112233445566778899AABBCCDDEEFF"
        );
        assert_eq!(stream.backtrace[0].offset, 0x100);
        assert_eq!(stream.backtrace[1].offset, 0x200);
    }
}
