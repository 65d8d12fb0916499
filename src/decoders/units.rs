// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::Argument;

/// `%{bitrate}d`: bits per second with decimal prefixes
pub(crate) fn bitrate(argument: &Argument) -> Option<String> {
    let bits = argument.as_u64()?;
    const KILO: u64 = 1000;
    const MEGA: u64 = 1000 * 1000;
    const GIGA: u64 = 1000 * 1000 * 1000;

    let value = match bits {
        0..=999 => format!("{bits} bps"),
        1000..=999_999 => format!("{:.3} Kbps", bits as f64 / KILO as f64),
        1_000_000..=999_999_999 => format!("{:.3} Mbps", bits as f64 / MEGA as f64),
        _ => format!("{:.3} Gbps", bits as f64 / GIGA as f64),
    };
    Some(value)
}

/// `%{iec-bytes}d`: bytes with binary prefixes
pub(crate) fn iec_bytes(argument: &Argument) -> Option<String> {
    let bytes = argument.as_u64()?;
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;

    let value = if bytes < KIB {
        format!("{bytes} bytes")
    } else if bytes < MIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else if bytes < GIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    };
    Some(value)
}
