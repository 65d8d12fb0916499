// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::Argument;

/// `%{BOOL}d` renders YES/NO
pub(crate) fn uppercase_bool(argument: &Argument) -> Option<String> {
    let value = argument.as_u64()?;
    Some(if value == 0 {
        String::from("NO")
    } else {
        String::from("YES")
    })
}

/// `%{bool}d` renders true/false
pub(crate) fn lowercase_bool(argument: &Argument) -> Option<String> {
    let value = argument.as_u64()?;
    Some(if value == 0 {
        String::from("false")
    } else {
        String::from("true")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracev3::firehose::args::{ArgPrivacy, ArgValue, Argument};

    fn scalar(raw: u64) -> Argument {
        Argument {
            value: ArgValue::Scalar { raw, width: 4 },
            privacy: ArgPrivacy::Public,
            descriptor: 0,
        }
    }

    #[test]
    fn test_uppercase_bool() {
        assert_eq!(uppercase_bool(&scalar(0)).unwrap(), "NO");
        assert_eq!(uppercase_bool(&scalar(1)).unwrap(), "YES");
        assert_eq!(uppercase_bool(&scalar(255)).unwrap(), "YES");
    }

    #[test]
    fn test_lowercase_bool() {
        assert_eq!(lowercase_bool(&scalar(0)).unwrap(), "false");
        assert_eq!(lowercase_bool(&scalar(1)).unwrap(), "true");
    }
}
