// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::Bytes;
use nom::number::complete::le_u64;
use nom::sequence::tuple;

/// A loss tracepoint (activity_type 0x7): a count of entries dropped
/// between two continuous timestamps. No message data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossEntry {
    pub start_time: u64,
    pub end_time: u64,
    pub count: u64,
}

impl LossEntry {
    pub(crate) fn parse(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, LossEntry> {
        let (input, (start_time, end_time, count)) = tuple((le_u64, le_u64, le_u64))(data)?;
        Ok((
            input,
            LossEntry {
                start_time,
                end_time,
                count,
            },
        ))
    }
}
