// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{extract_string, extract_uuid, Bytes};
use nom::bytes::complete::take;
use nom::number::complete::{le_u32, le_u64};
use nom::sequence::tuple;
use serde::{Deserialize, Serialize};

/// The tracev3 header chunk (tag 0x1000): boot identity, Mach timebase,
/// and machine metadata for everything that follows in the file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceContext {
    pub mach_time_numerator: u32,
    pub mach_time_denominator: u32,
    pub continuous_time: u64,
    /// Wall clock seconds when the file was started
    pub start_wall_time: u64,
    pub bias_min: u32,
    /// 0 no DST, 1 DST
    pub daylight_savings: u32,
    pub build_version: String,
    pub hardware_model: String,
    pub boot_uuid: String,
    pub logd_pid: u32,
    pub logd_exit_status: u32,
    pub timezone_path: String,
}

impl TraceContext {
    /// Short timezone name from the zoneinfo path
    pub fn timezone_name(&self) -> String {
        self.timezone_path
            .split('/')
            .next_back()
            .unwrap_or("Unknown Timezone Name")
            .to_string()
    }

    /// Parse the header chunk body (bytes after the chunk envelope). The
    /// body is a fixed run of sub-chunks tagged 0x6100 through 0x6103
    pub fn parse(body: Bytes<'_>) -> nom::IResult<Bytes<'_>, TraceContext> {
        fn fixed_string(input: Bytes<'_>, length: u8) -> nom::IResult<Bytes<'_>, String> {
            let (input, raw) = take(length)(input)?;
            let (_, value) = extract_string(raw)?;
            Ok((input, value))
        }

        let (input, (mach_time_numerator, mach_time_denominator, continuous_time)) =
            tuple((le_u32, le_u32, le_u64))(body)?;
        let (input, (start_wall_time, _unknown, bias_min, daylight_savings)) =
            tuple((le_u64, le_u32, le_u32, le_u32))(input)?;
        let (input, _unknown_flags) = le_u32(input)?;

        // 0x6100: sub-chunk continuous time
        let (input, (_tag, _size, _sub_chunk_continuous_time)) =
            tuple((le_u32, le_u32, le_u64))(input)?;

        // 0x6101: build version and hardware model
        const BUILD_VERSION_SIZE: u8 = 16;
        const HARDWARE_MODEL_SIZE: u8 = 32;
        let (input, (_tag, _size, _unknown2, _unknown3)) =
            tuple((le_u32, le_u32, le_u32, le_u32))(input)?;
        let (input, build_version) = fixed_string(input, BUILD_VERSION_SIZE)?;
        let (input, hardware_model) = fixed_string(input, HARDWARE_MODEL_SIZE)?;

        // 0x6102: boot uuid and logd state
        let (input, (_tag, _size)) = tuple((le_u32, le_u32))(input)?;
        let (input, boot_uuid) = extract_uuid(input)?;
        let (input, (logd_pid, logd_exit_status)) = tuple((le_u32, le_u32))(input)?;

        // 0x6103: timezone path
        const TIMEZONE_PATH_SIZE: u8 = 48;
        let (input, (_tag, _size)) = tuple((le_u32, le_u32))(input)?;
        let (input, timezone_path) = fixed_string(input, TIMEZONE_PATH_SIZE)?;

        Ok((
            input,
            TraceContext {
                mach_time_numerator,
                mach_time_denominator,
                continuous_time,
                start_wall_time,
                bias_min,
                daylight_savings,
                build_version,
                hardware_model,
                boot_uuid,
                logd_pid,
                logd_exit_status,
                timezone_path,
            },
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::TraceContext;

    /// Encode a header chunk body with the given boot UUID and timebase
    pub(crate) fn test_header_bytes(boot_uuid: u128, numer: u32, denom: u32) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(&numer.to_le_bytes());
        data.extend_from_slice(&denom.to_le_bytes());
        data.extend_from_slice(&139417370585359_u64.to_le_bytes());
        data.extend_from_slice(&1645401904_u64.to_le_bytes());
        data.extend_from_slice(&625355_u32.to_le_bytes());
        data.extend_from_slice(&300_u32.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        // 0x6100
        data.extend_from_slice(&0x6100_u32.to_le_bytes());
        data.extend_from_slice(&8_u32.to_le_bytes());
        data.extend_from_slice(&450429435277318_u64.to_le_bytes());
        // 0x6101
        data.extend_from_slice(&0x6101_u32.to_le_bytes());
        data.extend_from_slice(&56_u32.to_le_bytes());
        data.extend_from_slice(&7_u32.to_le_bytes());
        data.extend_from_slice(&8_u32.to_le_bytes());
        data.extend_from_slice(b"21A559\0\0\0\0\0\0\0\0\0\0");
        let mut hardware = [0_u8; 32];
        hardware[..14].copy_from_slice(b"MacBookPro16,1");
        data.extend_from_slice(&hardware);
        // 0x6102
        data.extend_from_slice(&0x6102_u32.to_le_bytes());
        data.extend_from_slice(&24_u32.to_le_bytes());
        data.extend_from_slice(&boot_uuid.to_be_bytes());
        data.extend_from_slice(&85_u32.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        // 0x6103
        data.extend_from_slice(&0x6103_u32.to_le_bytes());
        data.extend_from_slice(&48_u32.to_le_bytes());
        let mut timezone = [0_u8; 48];
        let path = b"/var/db/timezone/zoneinfo/America/New_York";
        timezone[..path.len()].copy_from_slice(path);
        data.extend_from_slice(&timezone);
        data
    }

    #[test]
    fn test_parse_header() {
        let data = test_header_bytes(0xC320B8CE97FA4DA59F317D392E389CEA, 1, 1);
        let (_, context) = TraceContext::parse(&data).unwrap();

        assert_eq!(context.mach_time_numerator, 1);
        assert_eq!(context.mach_time_denominator, 1);
        assert_eq!(context.continuous_time, 139417370585359);
        assert_eq!(context.start_wall_time, 1645401904);
        assert_eq!(context.bias_min, 300);
        assert_eq!(context.daylight_savings, 0);
        assert_eq!(context.build_version, "21A559");
        assert_eq!(context.hardware_model, "MacBookPro16,1");
        assert_eq!(context.boot_uuid, "C320B8CE97FA4DA59F317D392E389CEA");
        assert_eq!(context.logd_pid, 85);
        assert_eq!(context.logd_exit_status, 0);
        assert_eq!(
            context.timezone_path,
            "/var/db/timezone/zoneinfo/America/New_York"
        );
        assert_eq!(context.timezone_name(), "New_York");
    }
}
