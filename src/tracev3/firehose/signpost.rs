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

/// A signpost tracepoint (activity_type 0x6): performance markers with
/// begin/end correlation. The 8-byte signpost id follows the flag-driven
/// fields; the name location arrives via the 0x0200 flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignpostEntry {
    pub common: CommonFields,
    pub signpost_id: u64,
}

impl SignpostEntry {
    pub(crate) fn parse(
        data: Bytes<'_>,
        flags: EntryFlags,
    ) -> nom::IResult<Bytes<'_>, SignpostEntry> {
        let (input, common) = CommonFields::parse(data, flags)?;
        let (input, signpost_id) = le_u64(input)?;
        Ok((input, SignpostEntry { common, signpost_id }))
    }
}
