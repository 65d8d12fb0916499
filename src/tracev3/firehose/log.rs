// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::Bytes;
use crate::tracev3::firehose::flags::EntryFlags;
use crate::tracev3::firehose::CommonFields;

/// A log tracepoint (activity_type 0x4): log default, info, debug, error,
/// and fault messages. All state lives in the flag-driven common fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntry {
    pub common: CommonFields,
}

impl LogEntry {
    pub(crate) fn parse(data: Bytes<'_>, flags: EntryFlags) -> nom::IResult<Bytes<'_>, LogEntry> {
        let (input, common) = CommonFields::parse(data, flags)?;
        Ok((input, LogEntry { common }))
    }
}
