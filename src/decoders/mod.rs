// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! Decoders for Apple's custom `%{type}` logging objects, keyed by the
//! literal type string from the format specifier.

mod bool;
mod darwin;
mod network;
mod opendirectory;
mod time;
mod units;
mod uuid;

use crate::tracev3::firehose::args::Argument;

pub(crate) use darwin::errno_string;

/// Outcome of a decoder lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// The type is registered and produced a value
    Value(String),
    /// The type is registered but the argument did not fit it
    Error,
    /// No decoder is registered for the type string
    Unknown,
}

type DecoderFn = fn(&Argument) -> Option<String>;

// Registered object decoders, keyed by the literal type string that
// appears inside %{...}
const DECODERS: &[(&str, DecoderFn)] = &[
    ("BOOL", bool::uppercase_bool),
    ("bool", bool::lowercase_bool),
    ("uuid_t", uuid::uuid_string),
    ("darwin.errno", darwin::errno_message),
    ("darwin.mode", darwin::permission_mode),
    ("darwin.signal", darwin::signal_name),
    ("mach.errno", darwin::mach_error),
    ("network:in_addr", network::ipv_four),
    ("network:in6_addr", network::ipv_six),
    ("network:sockaddr", network::sockaddr),
    ("time_t", time::unix_time),
    ("timeval", time::timeval),
    ("timespec", time::timespec),
    ("bitrate", units::bitrate),
    ("iec-bytes", units::iec_bytes),
    ("odtypes:ODError", opendirectory::od_error),
    ("odtypes:mbridtype", opendirectory::member_id_type),
    ("odtypes:mbr_details", opendirectory::member_details),
    ("odtypes:nt_sid_t", opendirectory::sid_string),
];

/// Run the decoder registered for a type string against an argument
pub(crate) fn decode(type_name: &str, argument: &Argument) -> Decoded {
    let Some((_, decoder)) = DECODERS
        .iter()
        .find(|(name, _)| *name == type_name)
    else {
        return Decoded::Unknown;
    };
    match decoder(argument) {
        Some(value) => Decoded::Value(value),
        None => Decoded::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, Decoded};
    use crate::tracev3::firehose::args::{ArgPrivacy, ArgValue, Argument};

    fn scalar(raw: u64, width: u8) -> Argument {
        Argument {
            value: ArgValue::Scalar { raw, width },
            privacy: ArgPrivacy::Public,
            descriptor: 0,
        }
    }

    #[test]
    fn test_decode_bool() {
        assert_eq!(
            decode("BOOL", &scalar(1, 4)),
            Decoded::Value(String::from("YES"))
        );
        assert_eq!(
            decode("bool", &scalar(0, 4)),
            Decoded::Value(String::from("false"))
        );
    }

    #[test]
    fn test_decode_uuid() {
        let argument = Argument {
            value: ArgValue::Bytes(vec![
                0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
                0xDD, 0xEE, 0xFF,
            ]),
            privacy: ArgPrivacy::Public,
            descriptor: 0x40,
        };
        assert_eq!(
            decode("uuid_t", &argument),
            Decoded::Value(String::from("00112233-4455-6677-8899-AABBCCDDEEFF"))
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        assert_eq!(decode("myapp:custom", &scalar(1, 4)), Decoded::Unknown);
    }

    #[test]
    fn test_decode_shape_mismatch() {
        // uuid_t requires 16 raw bytes
        assert_eq!(decode("uuid_t", &scalar(1, 4)), Decoded::Error);
    }
}
