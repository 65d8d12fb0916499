// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::Bytes;
use crate::tracev3::firehose::flags::EntryFlags;
use crate::tracev3::firehose::CommonFields;

/// A kernel trace tracepoint (activity_type 0x3). Only the main executable
/// lookup method has been observed for trace format strings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceEntry {
    pub common: CommonFields,
}

impl TraceEntry {
    pub(crate) fn parse(data: Bytes<'_>, flags: EntryFlags) -> nom::IResult<Bytes<'_>, TraceEntry> {
        let (input, common) = CommonFields::parse(data, flags)?;
        Ok((input, TraceEntry { common }))
    }
}

#[cfg(test)]
mod tests {
    use super::TraceEntry;
    use crate::tracev3::firehose::flags::{EntryFlags, FormatSource};

    #[test]
    fn test_parse_trace() {
        let data: [u8; 0] = [];
        let (_, trace) = TraceEntry::parse(&data, EntryFlags(0x2)).unwrap();
        assert_eq!(trace.common.format_source, FormatSource::MainExe);
    }
}
