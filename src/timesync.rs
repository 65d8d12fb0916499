// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::error::LogError;
use crate::reader::{extract_uuid, Bytes};
use log::error;
use nom::bytes::complete::take;
use nom::number::complete::{le_i32, le_i64, le_u16, le_u32, le_u64};
use nom::sequence::tuple;
use nom::Needed;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) const TIMESYNC_BOOT_MAGIC: u16 = 0xbbb0;
pub(crate) const TIMESYNC_RECORD_MAGIC: u16 = 0x54b0;

/// One boot session from a timesync file: the wall-clock anchor plus the
/// run of sync records recorded during that boot
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TimesyncBoot {
    pub boot_uuid: String,
    pub header_size: u16,
    pub timebase_numerator: u32,
    pub timebase_denominator: u32,
    /// Wall clock at boot, nanoseconds since UNIXEPOCH
    pub boot_wall_ns: i64,
    pub timezone_offset_mins: u32,
    /// 0 is no DST, 1 is DST
    pub daylight_savings: u32,
    pub records: Vec<TimesyncRecord>,
}

/// A single continuous-time to wall-clock sync point
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TimesyncRecord {
    pub flags: u32,
    /// Mach continuous timestamp
    pub continuous_time: u64,
    /// Nanoseconds since UNIXEPOCH (UTC)
    pub wall_time_ns: i64,
    pub gmt_offset_mins: i32,
    /// 0 is no DST, 1 is DST
    pub dst_flag: u32,
}

impl TimesyncBoot {
    /// Parse the contents of a timesync file: 48-byte boot headers each
    /// followed by a run of 32-byte sync records until the next boot header
    /// or end of file
    pub fn parse_timesync_data(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, Vec<TimesyncBoot>> {
        let mut boots: Vec<TimesyncBoot> = Vec::new();
        let mut input = data;

        while !input.is_empty() {
            let (_, magic) = le_u16(input)?;
            if magic == TIMESYNC_BOOT_MAGIC {
                let (remaining, boot) = TimesyncBoot::parse_boot(input)?;
                boots.push(boot);
                input = remaining;
            } else if magic == TIMESYNC_RECORD_MAGIC {
                let (remaining, record) = TimesyncBoot::parse_record(input)?;
                match boots.last_mut() {
                    Some(boot) => boot.records.push(record),
                    None => {
                        error!("[aulogs] Timesync record encountered before any boot header");
                        return Err(nom::Err::Incomplete(Needed::Unknown));
                    }
                }
                input = remaining;
            } else {
                error!(
                    "[aulogs] Incorrect Timesync magic. Expected {:#x} or {:#x}. Got: {:#x}",
                    TIMESYNC_BOOT_MAGIC, TIMESYNC_RECORD_MAGIC, magic
                );
                return Err(nom::Err::Incomplete(Needed::Unknown));
            }
        }

        // Sync records are expected sorted by continuous time. Keep the
        // invariant even on damaged files so binary search stays valid
        for boot in &mut boots {
            boot.records
                .sort_by_key(|record| record.continuous_time);
        }
        Ok((input, boots))
    }

    fn parse_boot(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, TimesyncBoot> {
        let (input, (_magic, header_size, _unknown)) = tuple((le_u16, le_u16, le_u32))(data)?;
        let (input, boot_uuid) = extract_uuid(input)?;
        let (input, (timebase_numerator, timebase_denominator)) = tuple((le_u32, le_u32))(input)?;
        let (input, boot_wall_ns) = le_i64(input)?;
        let (input, (timezone_offset_mins, daylight_savings)) = tuple((le_u32, le_u32))(input)?;

        Ok((
            input,
            TimesyncBoot {
                boot_uuid,
                header_size,
                timebase_numerator,
                timebase_denominator,
                boot_wall_ns,
                timezone_offset_mins,
                daylight_savings,
                records: Vec::new(),
            },
        ))
    }

    fn parse_record(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, TimesyncRecord> {
        let (input, (_magic, _pad, flags)) = tuple((le_u16, take(2_usize), le_u32))(data)?;
        let (input, (continuous_time, wall_time_ns)) = tuple((le_u64, le_i64))(input)?;
        let (input, (gmt_offset_mins, dst_flag)) = tuple((le_i32, le_u32))(input)?;

        Ok((
            input,
            TimesyncRecord {
                flags,
                continuous_time,
                wall_time_ns,
                gmt_offset_mins,
                dst_flag,
            },
        ))
    }
}

/// All timesync boots from a diagnostics directory, keyed by boot UUID
#[derive(Debug, Default)]
pub struct TimesyncDb {
    boots: HashMap<String, TimesyncBoot>,
}

impl TimesyncDb {
    pub fn from_boots(boots: Vec<TimesyncBoot>) -> Self {
        let mut map: HashMap<String, TimesyncBoot> = HashMap::new();
        for boot in boots {
            match map.get_mut(&boot.boot_uuid) {
                Some(existing) => {
                    let mut records = boot.records;
                    existing.records.append(&mut records);
                    existing.records.sort_by_key(|record| record.continuous_time);
                }
                None => {
                    map.insert(boot.boot_uuid.clone(), boot);
                }
            }
        }
        TimesyncDb { boots: map }
    }

    pub fn boot(&self, boot_uuid: &str) -> Option<&TimesyncBoot> {
        self.boots.get(boot_uuid)
    }

    /// Reconstruct the wall clock for a Mach continuous timestamp.
    ///
    /// The rightmost sync record with `continuous_time <= time` anchors the
    /// conversion (an exact match selects the later record). Between two sync
    /// records the wall clock is interpolated linearly; past the last record
    /// (or before the first, with only the boot anchor available) the Mach
    /// timebase extrapolates. Arithmetic widens through i128 and truncates
    /// toward zero.
    pub fn to_wall_ns(&self, boot_uuid: &str, continuous_time: u64) -> Result<i64, LogError> {
        let boot = self
            .boots
            .get(boot_uuid)
            .ok_or_else(|| LogError::UnknownBoot(boot_uuid.to_string()))?;

        let upper = boot
            .records
            .partition_point(|record| record.continuous_time <= continuous_time);

        let (anchor_time, anchor_wall) = if upper == 0 {
            // Nothing at or before the timestamp. The boot header anchors
            // wall time at continuous time zero
            (0, boot.boot_wall_ns)
        } else {
            let record = &boot.records[upper - 1];
            (record.continuous_time, record.wall_time_ns)
        };

        let elapsed = i128::from(continuous_time) - i128::from(anchor_time);

        if let Some(next) = boot.records.get(upper) {
            let span = i128::from(next.continuous_time) - i128::from(anchor_time);
            if span > 0 {
                let wall_span = i128::from(next.wall_time_ns) - i128::from(anchor_wall);
                let wall = i128::from(anchor_wall) + elapsed * wall_span / span;
                return Ok(wall as i64);
            }
        }

        // Past the last sync point (or the boot has none). Scale elapsed
        // ticks with the Mach timebase. Apple Silicon uses 125/3, Intel 1/1
        let numerator = i128::from(boot.timebase_numerator.max(1));
        let denominator = i128::from(boot.timebase_denominator.max(1));
        let wall = i128::from(anchor_wall) + elapsed * numerator / denominator;
        Ok(wall as i64)
    }
}
