// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::{ArgValue, Argument};
use chrono::{SecondsFormat, TimeZone, Utc};

/// `%{time_t}d`: seconds since UNIXEPOCH
pub(crate) fn unix_time(argument: &Argument) -> Option<String> {
    let seconds = argument.as_i64()?;
    let timestamp = Utc.timestamp_opt(seconds, 0).single()?;
    Some(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// `%{timeval}.*P`: seconds plus microseconds
pub(crate) fn timeval(argument: &Argument) -> Option<String> {
    let ArgValue::Bytes(bytes) = &argument.value else {
        return None;
    };
    let (seconds, microseconds) = match bytes.len() {
        // 64-bit tv_sec + 32-bit tv_usec (padded to 16 on macOS)
        16 => (
            i64::from_le_bytes(bytes[0..8].try_into().ok()?),
            i64::from(i32::from_le_bytes(bytes[8..12].try_into().ok()?)),
        ),
        8 => (
            i64::from(i32::from_le_bytes(bytes[0..4].try_into().ok()?)),
            i64::from(i32::from_le_bytes(bytes[4..8].try_into().ok()?)),
        ),
        _ => return None,
    };

    let nanos = u32::try_from(microseconds.max(0) * 1000).ok()?;
    let timestamp = Utc.timestamp_opt(seconds, nanos).single()?;
    Some(timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// `%{timespec}.*P`: seconds plus nanoseconds
pub(crate) fn timespec(argument: &Argument) -> Option<String> {
    let ArgValue::Bytes(bytes) = &argument.value else {
        return None;
    };
    if bytes.len() != 16 {
        return None;
    }
    let seconds = i64::from_le_bytes(bytes[0..8].try_into().ok()?);
    let nanoseconds = i64::from_le_bytes(bytes[8..16].try_into().ok()?);

    let nanos = u32::try_from(nanoseconds.max(0)).ok()?;
    let timestamp = Utc.timestamp_opt(seconds, nanos).single()?;
    Some(timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
}
