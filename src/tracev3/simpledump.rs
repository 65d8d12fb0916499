// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{extract_string, extract_uuid, Bytes};
use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32, le_u64};
use nom::sequence::tuple;

// Introduced in macOS Monterey (12). A "simpler" Statedump carrying a
// single message string
#[derive(Debug, Clone, Default)]
pub struct Simpledump {
    pub proc_id_1: u64,
    pub proc_id_2: u64,
    pub continuous_time: u64,
    pub thread_id: u64,
    pub unknown_offset: u32,
    pub ttl: u16,
    pub unknown_type: u16,
    pub sender_uuid: String,
    pub dsc_uuid: String,
    pub subsystem: String,
    pub message: String,
}

impl Simpledump {
    /// Parse a simpledump chunk body (bytes after the chunk envelope)
    pub fn parse(body: Bytes<'_>) -> nom::IResult<Bytes<'_>, Simpledump> {
        let (input, (proc_id_1, proc_id_2, continuous_time, thread_id)) =
            tuple((le_u64, le_u64, le_u64, le_u64))(body)?;
        let (input, (unknown_offset, ttl, unknown_type)) =
            tuple((le_u32, le_u16, le_u16))(input)?;
        let (input, sender_uuid) = extract_uuid(input)?;
        let (input, dsc_uuid) = extract_uuid(input)?;
        let (input, (_message_string_count, subsystem_size, message_size)) =
            tuple((le_u32, le_u32, le_u32))(input)?;

        let (input, subsystem_data) = take(subsystem_size)(input)?;
        let (input, message_data) = take(message_size)(input)?;

        let mut result = Simpledump {
            proc_id_1,
            proc_id_2,
            continuous_time,
            thread_id,
            unknown_offset,
            ttl,
            unknown_type,
            sender_uuid,
            dsc_uuid,
            subsystem: String::new(),
            message: String::new(),
        };
        if !subsystem_data.is_empty() {
            let (_, subsystem) = extract_string(subsystem_data)?;
            result.subsystem = subsystem;
        }
        if !message_data.is_empty() {
            let (_, message) = extract_string(message_data)?;
            result.message = message;
        }
        Ok((input, result))
    }
}
