// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use base64::{engine::general_purpose, Engine};
use chrono::{SecondsFormat, TimeZone, Utc};
use log::{error, warn};
use nom::{
    bytes::complete::{take, take_while},
    combinator::{fail, opt},
    number::complete::be_u128,
    sequence::tuple,
};
use std::str::from_utf8;

/// Slice of raw log bytes handed between parsers
pub(crate) type Bytes<'a> = &'a [u8];

/// Padding needed to advance to the next 8-byte boundary
pub(crate) fn padding_size_8(data: u64) -> u64 {
    const ALIGNMENT: u64 = 8;
    (ALIGNMENT - (data & (ALIGNMENT - 1))) & (ALIGNMENT - 1)
}

/// Padding needed to advance to the next 4-byte boundary
pub(crate) fn padding_size_4(data: u64) -> u64 {
    const ALIGNMENT: u64 = 4;
    (ALIGNMENT - (data & (ALIGNMENT - 1))) & (ALIGNMENT - 1)
}

/// Read 16 big-endian bytes and render the uppercase hex UUID string used
/// throughout the catalog files
pub(crate) fn extract_uuid(input: Bytes<'_>) -> nom::IResult<Bytes<'_>, String> {
    let (input, uuid) = be_u128(input)?;
    Ok((input, format!("{uuid:032X}")))
}

const NULL_BYTE: u8 = 0;

/// Extract an UTF8 string from a byte array, stopping at `NULL_BYTE` or end
/// of input. Consumes the terminator
pub(crate) fn cstring(input: Bytes<'_>) -> nom::IResult<Bytes<'_>, String> {
    let (input, (str_part, _)) =
        tuple((take_while(|b: u8| b != NULL_BYTE), opt(take(1_usize))))(input)?;
    match from_utf8(str_part) {
        Ok(results) => Ok((input, results.to_string())),
        Err(_) => fail(input),
    }
}

/// Extract a string that may or may not carry an end-of-string character.
/// Invalid UTF8 is reported and replaced with a placeholder so parsing
/// continues
pub(crate) fn extract_string(data: Bytes<'_>) -> nom::IResult<Bytes<'_>, String> {
    if data.is_empty() {
        error!("[aulogs] Cannot extract string. Empty input.");
        return Ok((data, String::from("Could not extract string")));
    }

    let (input, path) = take_while(|b: u8| b != NULL_BYTE)(data)?;
    match from_utf8(path) {
        Ok(results) => Ok((input, results.to_string())),
        Err(err) => {
            warn!("[aulogs] Failed to extract string: {err:?}");
            Ok((input, String::from("Could not extract string")))
        }
    }
}

/// Extract a string of a declared size from firehose string item entries,
/// stripping trailing end-of-string characters. A zero size is `(null)`
pub(crate) fn extract_string_size(
    data: Bytes<'_>,
    message_size: u64,
) -> nom::IResult<Bytes<'_>, String> {
    if message_size == 0 {
        return Ok((data, String::from("(null)")));
    }

    // If the remaining data is smaller than the declared size just use what is left
    let size = if (data.len() as u64) < message_size {
        data.len() as u64
    } else {
        message_size
    };

    let (input, message) = take(size)(data)?;
    match String::from_utf8(message.to_vec()) {
        Ok(results) => Ok((input, results.trim_end_matches(char::from(0)).to_string())),
        Err(err) => {
            error!("[aulogs] Failed to extract sized string: {err:?}");
            Ok((input, String::from("Could not extract string")))
        }
    }
}

/// Base64 encode arbitrary payload bytes with the STANDARD engine
pub(crate) fn encode_standard(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

/// Convert `UnixEpoch` nanoseconds to ISO RFC 3339
pub fn unixepoch_to_iso(timestamp: i64) -> String {
    let date_time = Utc.timestamp_nanos(timestamp);
    date_time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_size_8() {
        assert_eq!(padding_size_8(8), 0);
        assert_eq!(padding_size_8(9), 7);
        assert_eq!(padding_size_8(14), 2);
    }

    #[test]
    fn test_padding_size_4() {
        assert_eq!(padding_size_4(4), 0);
        assert_eq!(padding_size_4(5), 3);
    }

    #[test]
    fn test_extract_uuid() -> anyhow::Result<()> {
        let input = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ];
        let (_, uuid) = extract_uuid(&input).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        assert_eq!(uuid, "00112233445566778899AABBCCDDEEFF");
        Ok(())
    }

    #[test]
    fn test_cstring() -> anyhow::Result<()> {
        let input = &[55, 57, 54, 46, 49, 48, 48, 0, 42, 42];
        let (remaining, value) = cstring(input)?;
        assert_eq!(value, "796.100");
        assert_eq!(remaining, [42, 42]);

        let input = &[0, 42];
        let (remaining, value) = cstring(input)?;
        assert_eq!(value, "");
        assert_eq!(remaining, [42]);
        Ok(())
    }

    #[test]
    fn test_extract_string() {
        let test_data = [55, 57, 54, 46, 49, 48, 48, 0];
        let (_, results) = extract_string(&test_data).unwrap();
        assert_eq!(results, "796.100");

        let unterminated = [104, 105];
        let (_, results) = extract_string(&unterminated).unwrap();
        assert_eq!(results, "hi");
    }

    #[test]
    fn test_extract_string_size() {
        let test_data = [55, 57, 54, 46, 49, 48, 48, 0];
        let (_, results) = extract_string_size(&test_data, 8).unwrap();
        assert_eq!(results, "796.100");

        let (_, results) = extract_string_size(&test_data, 0).unwrap();
        assert_eq!(results, "(null)");

        // Declared size larger than the remaining data
        let (_, results) = extract_string_size(&test_data[..4], 20).unwrap();
        assert_eq!(results, "796.");
    }

    #[test]
    fn test_encode_standard() {
        assert_eq!(encode_standard(b"Hello word!"), "SGVsbG8gd29yZCE=");
    }

    #[test]
    fn test_unixepoch_to_iso() {
        let result = unixepoch_to_iso(1650767813342574583);
        assert_eq!(result, "2022-04-24T02:36:53.342574583Z");
    }
}
