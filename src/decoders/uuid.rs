// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::{ArgValue, Argument};

/// `%{uuid_t}.16P`: 16 raw bytes rendered as the canonical 8-4-4-4-12
/// uppercase hex form
pub(crate) fn uuid_string(argument: &Argument) -> Option<String> {
    let ArgValue::Bytes(bytes) = &argument.value else {
        return None;
    };
    if bytes.len() != 16 {
        return None;
    }

    let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}
