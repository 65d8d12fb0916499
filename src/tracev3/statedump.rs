// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{extract_string, extract_uuid, Bytes};
use log::warn;
use nom::bytes::complete::take;
use nom::number::complete::{le_u32, le_u64};
use nom::sequence::tuple;

/// A statedump chunk (tag 0x1003): a process state snapshot logged by
/// `os_state` handlers
#[derive(Debug, Clone, Default)]
pub struct Statedump {
    pub proc_id_1: u64,
    pub proc_id_2: u32,
    pub ttl: u8,
    pub continuous_time: u64,
    pub activity_id: u64,
    pub sender_uuid: String,
    pub data_kind: u32,
    pub decoder_library: String,
    pub decoder_type: String,
    pub title: String,
    pub data: Vec<u8>,
}

pub mod data_kind {
    pub const PLIST: u32 = 0x1;
    pub const PROTOBUF: u32 = 0x2;
    pub const CUSTOM_OBJECT: u32 = 0x3;
}

impl Statedump {
    /// Parse a statedump chunk body (bytes after the chunk envelope)
    pub fn parse(body: Bytes<'_>) -> nom::IResult<Bytes<'_>, Statedump> {
        let (input, (proc_id_1, proc_id_2)) = tuple((le_u64, le_u32))(body)?;
        let (input, ttl) = nom::number::complete::le_u8(input)?;
        const RESERVED_SIZE: u8 = 3;
        let (input, _reserved) = take(RESERVED_SIZE)(input)?;
        let (input, (continuous_time, activity_id)) = tuple((le_u64, le_u64))(input)?;
        let (input, sender_uuid) = extract_uuid(input)?;
        let (input, (data_kind, data_size)) = tuple((le_u32, le_u32))(input)?;

        fn fixed_name(input: Bytes<'_>) -> nom::IResult<Bytes<'_>, String> {
            const NAME_SIZE: u8 = 64;
            let (input, raw) = take(NAME_SIZE)(input)?;
            let (_, value) = extract_string(raw)?;
            Ok((input, value))
        }
        let (input, decoder_library) = fixed_name(input)?;
        let (input, decoder_type) = fixed_name(input)?;
        let (input, title) = fixed_name(input)?;

        let (input, data) = take(data_size)(input)?;

        Ok((
            input,
            Statedump {
                proc_id_1,
                proc_id_2,
                ttl,
                continuous_time,
                activity_id,
                sender_uuid,
                data_kind,
                decoder_library,
                decoder_type,
                title,
                data: data.to_vec(),
            },
        ))
    }

    /// Render the statedump payload. Property lists are handed to an
    /// external decoder; the core only labels them
    pub fn render_data(&self) -> String {
        match self.data_kind {
            data_kind::PLIST => format!("Statedump Property List ({} bytes)", self.data.len()),
            data_kind::PROTOBUF => String::from("Statedump Protocol Buffer"),
            data_kind::CUSTOM_OBJECT => match extract_string(&self.data) {
                Ok((_, value)) => value,
                Err(_) => String::from("Failed to extract statedump object string"),
            },
            unknown => {
                warn!("[aulogs] Unknown statedump data kind: {unknown}");
                match extract_string(&self.data) {
                    Ok((_, value)) => value,
                    Err(_) => String::from("Failed to extract string from statedump"),
                }
            }
        }
    }
}
