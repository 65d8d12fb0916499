// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::{ArgValue, Argument};
use std::net::{Ipv4Addr, Ipv6Addr};

fn argument_bytes(argument: &Argument) -> Option<&[u8]> {
    match &argument.value {
        ArgValue::Bytes(bytes) => Some(bytes),
        _ => None,
    }
}

/// `%{network:in_addr}d`: 4 bytes in network order
pub(crate) fn ipv_four(argument: &Argument) -> Option<String> {
    // in_addr may arrive as raw bytes or as a 4-byte scalar
    if let Some(bytes) = argument_bytes(argument) {
        if bytes.len() != 4 {
            return None;
        }
        return Some(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]).to_string());
    }
    let raw = argument.as_u64()? as u32;
    let octets = raw.to_le_bytes();
    Some(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]).to_string())
}

/// `%{network:in6_addr}.16P`: 16 bytes in network order
pub(crate) fn ipv_six(argument: &Argument) -> Option<String> {
    let bytes = argument_bytes(argument)?;
    let array: [u8; 16] = bytes.try_into().ok()?;
    Some(Ipv6Addr::from(array).to_string())
}

/// `%{network:sockaddr}.*P`: a BSD sockaddr (length, family, payload)
pub(crate) fn sockaddr(argument: &Argument) -> Option<String> {
    let bytes = argument_bytes(argument)?;
    if bytes.len() < 2 {
        return None;
    }

    const AF_INET: u8 = 2;
    const AF_INET6: u8 = 30;
    let family = bytes[1];
    match family {
        AF_INET => {
            // sockaddr_in: len, family, port (BE), addr
            if bytes.len() < 8 {
                return None;
            }
            let port = u16::from_be_bytes([bytes[2], bytes[3]]);
            let address = Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);
            if port == 0 {
                Some(address.to_string())
            } else {
                Some(format!("{address}:{port}"))
            }
        }
        AF_INET6 => {
            // sockaddr_in6: len, family, port (BE), flowinfo, addr
            if bytes.len() < 24 {
                return None;
            }
            let port = u16::from_be_bytes([bytes[2], bytes[3]]);
            let array: [u8; 16] = bytes[8..24].try_into().ok()?;
            let address = Ipv6Addr::from(array);
            if port == 0 {
                Some(address.to_string())
            } else {
                Some(format!("[{address}]:{port}"))
            }
        }
        _ => Some(format!("Unknown sockaddr family: {family}")),
    }
}
