// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::Bytes;
use crate::tracev3::firehose::flags::EntryFlags;
use crate::tracev3::firehose::CommonFields;
use nom::number::complete::le_u64;
use nom::sequence::tuple;

/// An activity tracepoint (activity_type 0x2): activity create and
/// useraction events. Carries its own activity identifier ahead of the
/// flag-driven fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityEntry {
    pub activity_id: u64,
    /// Always 0x8000000000000000 in observed captures
    pub sentinel: u64,
    pub common: CommonFields,
}

impl ActivityEntry {
    /// Parse an activity entry payload. Useraction activities (log type
    /// 0x3) skip the leading activity identifier
    pub(crate) fn parse<'a>(
        data: Bytes<'a>,
        flags: EntryFlags,
        log_type: u8,
    ) -> nom::IResult<Bytes<'a>, ActivityEntry> {
        const USERACTION: u8 = 0x3;

        let mut activity = ActivityEntry::default();
        let mut input = data;
        if log_type != USERACTION {
            let (remaining, (activity_id, sentinel)) = tuple((le_u64, le_u64))(input)?;
            activity.activity_id = activity_id;
            activity.sentinel = sentinel;
            input = remaining;
        }

        let (input, common) = CommonFields::parse(input, flags)?;
        activity.common = common;
        Ok((input, activity))
    }
}

#[cfg(test)]
mod tests {
    use super::ActivityEntry;
    use crate::tracev3::firehose::flags::{EntryFlags, FormatSource};

    #[test]
    fn test_parse_activity() {
        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(&0xfbb2_u64.to_le_bytes());
        data.extend_from_slice(&0x8000000000000000_u64.to_le_bytes());
        // current aid + sentinel from the 0x0001 flag
        data.extend_from_slice(&0xfbb3_u64.to_le_bytes());
        data.extend_from_slice(&0x8000000000000000_u64.to_le_bytes());

        let flags = EntryFlags(0x1 | 0x2);
        let (_, activity) = ActivityEntry::parse(&data, flags, 0x1).unwrap();
        assert_eq!(activity.activity_id, 0xfbb2);
        assert_eq!(activity.sentinel, 0x8000000000000000);
        assert_eq!(activity.common.current_aid, Some(0xfbb3));
        assert_eq!(activity.common.format_source, FormatSource::MainExe);
    }

    #[test]
    fn test_parse_useraction_activity() {
        // Useraction entries have no leading activity id
        let data = 0xaabb_u64
            .to_le_bytes()
            .iter()
            .chain(0x8000000000000000_u64.to_le_bytes().iter())
            .copied()
            .collect::<Vec<u8>>();
        let flags = EntryFlags(0x1 | 0x2);
        let (_, activity) = ActivityEntry::parse(&data, flags, 0x3).unwrap();
        assert_eq!(activity.activity_id, 0);
        assert_eq!(activity.common.current_aid, Some(0xaabb));
    }
}
