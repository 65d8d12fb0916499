// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::{extract_uuid, Bytes};
use log::{debug, error};
use nom::number::complete::le_u16;
use nom::Needed;
use serde::{Deserialize, Serialize};

/// The firehose tracepoint flag bitmap. Bits mark which optional fields are
/// appended to the entry header and how the format string is located
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFlags(pub u16);

impl EntryFlags {
    const HAS_CURRENT_AID: u16 = 0x0001;
    const FMT_METHOD_MASK: u16 = 0x000e;
    const HAS_SUBSYSTEM: u16 = 0x0010;
    const HAS_TTL: u16 = 0x0020;
    const HAS_DATA_REF: u16 = 0x0100;
    const HAS_SIGNPOST_NAME: u16 = 0x0200;
    const HAS_PRIVATE_DATA: u16 = 0x0400;
    const HAS_CONTEXT_DATA: u16 = 0x1000;

    pub fn raw(self) -> u16 {
        self.0
    }

    /// 8 bytes AID plus 8 bytes sentinel precede the other optional fields
    pub fn has_current_aid(self) -> bool {
        self.0 & Self::HAS_CURRENT_AID != 0
    }

    /// 2-byte subsystem identifier into the catalog subsystem table
    pub fn has_subsystem(self) -> bool {
        self.0 & Self::HAS_SUBSYSTEM != 0
    }

    /// 1-byte time-to-live
    pub fn has_ttl(self) -> bool {
        self.0 & Self::HAS_TTL != 0
    }

    /// 2-byte index into the Oversize table; arguments live out of line
    pub fn has_data_ref(self) -> bool {
        self.0 & Self::HAS_DATA_REF != 0
    }

    /// 4-byte signpost name location
    pub fn has_signpost_name(self) -> bool {
        self.0 & Self::HAS_SIGNPOST_NAME != 0
    }

    /// Private string region offsets follow; string arguments may reference
    /// the page's private region
    pub fn has_private_data(self) -> bool {
        self.0 & Self::HAS_PRIVATE_DATA != 0
    }

    /// Activity context blob (backtrace) precedes the argument strings
    pub fn has_context_data(self) -> bool {
        self.0 & Self::HAS_CONTEXT_DATA != 0
    }

    /// Decode the format lookup method bits (mask 0x000e). The four has-uuid
    /// schemes are mutually exclusive
    pub fn format_location(self) -> Result<FormatLocation, u16> {
        match self.0 & Self::FMT_METHOD_MASK {
            0x2 => Ok(FormatLocation::MainExe),
            0x4 => Ok(FormatLocation::SharedCache),
            0x8 => Ok(FormatLocation::UuidRelative),
            0xa => Ok(FormatLocation::MainPlugin),
            0xc => Ok(FormatLocation::Absolute),
            other => Err(other),
        }
    }
}

/// Where the format string (and sender UUID) for an entry is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatLocation {
    /// Offset into the process main executable's uuidtext file
    MainExe,
    /// Absolute virtual offset into the shared cache (dsc)
    SharedCache,
    /// The uuidtext UUID is embedded in the entry itself
    UuidRelative,
    /// Semantics close to MainExe; observed on catalog v3 plugins. Raw
    /// values are preserved since interpretation is uncertain
    MainPlugin,
    /// Index into the catalog process entry's uuids_used table
    Absolute,
}

/// The format lookup method together with the extra bytes some methods
/// append to the entry (embedded UUID, uuids_used index)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormatSource {
    #[default]
    MainExe,
    SharedCache,
    UuidRelative(String),
    MainPlugin,
    Absolute { uuid_index: u16 },
}

impl FormatSource {
    /// Read the method-specific trailing bytes for the entry's format
    /// lookup scheme
    pub(crate) fn parse(input: Bytes<'_>, flags: EntryFlags) -> nom::IResult<Bytes<'_>, Self> {
        let location = match flags.format_location() {
            Ok(location) => location,
            Err(raw) => {
                error!("[aulogs] Unknown firehose format lookup method: {raw:#x}");
                return Err(nom::Err::Incomplete(Needed::Unknown));
            }
        };

        match location {
            FormatLocation::MainExe => Ok((input, FormatSource::MainExe)),
            FormatLocation::SharedCache => Ok((input, FormatSource::SharedCache)),
            FormatLocation::MainPlugin => {
                debug!("[aulogs] Firehose flag: main_plugin");
                Ok((input, FormatSource::MainPlugin))
            }
            FormatLocation::UuidRelative => {
                debug!("[aulogs] Firehose flag: uuid_relative");
                let (input, uuid) = extract_uuid(input)?;
                Ok((input, FormatSource::UuidRelative(uuid)))
            }
            FormatLocation::Absolute => {
                debug!("[aulogs] Firehose flag: absolute");
                let (input, uuid_index) = le_u16(input)?;
                Ok((input, FormatSource::Absolute { uuid_index }))
            }
        }
    }
}
