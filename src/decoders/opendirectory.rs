// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::reader::extract_string;
use crate::tracev3::firehose::args::{ArgValue, Argument};

/// `%{odtypes:ODError}d`: Open Directory framework error codes
pub(crate) fn od_error(argument: &Argument) -> Option<String> {
    let code = argument.as_i64()?;
    let message = match code {
        0 => "ODErrorSuccess",
        1000 => "ODErrorSessionLocalOnlyDaemonInUse",
        1001 => "ODErrorSessionNormalDaemonInUse",
        1002 => "ODErrorSessionDaemonRefused",
        1003 => "ODErrorSessionDaemonNotRunning",
        1100 => "ODErrorSessionProxyCommunicationError",
        1101 => "ODErrorSessionProxyVersionMismatch",
        1102 => "ODErrorSessionProxyIPUnreachable",
        1103 => "ODErrorSessionProxyUnknownHost",
        2000 => "ODErrorNodeUnknownName",
        2001 => "ODErrorNodeUnknownType",
        2002 => "ODErrorNodeDisabled",
        2100 => "ODErrorNodeConnectionFailed",
        2200 => "ODErrorNodeUnknownHost",
        3000 => "ODErrorQuerySynchronize",
        3100 => "ODErrorQueryInvalidMatchType",
        3101 => "ODErrorQueryUnsupportedMatchType",
        3102 => "ODErrorQueryTimeout",
        4000 => "ODErrorRecordReadOnlyNode",
        4001 => "ODErrorRecordPermissionError",
        4100 => "ODErrorRecordParameterError",
        4101 => "ODErrorRecordInvalidType",
        4102 => "ODErrorRecordAlreadyExists",
        4103 => "ODErrorRecordTypeDisabled",
        4104 => "ODErrorRecordNoLongerExists",
        4200 => "ODErrorRecordAttributeUnknownType",
        4201 => "ODErrorRecordAttributeNotFound",
        4202 => "ODErrorRecordAttributeValueSchemaError",
        4203 => "ODErrorRecordAttributeValueNotFound",
        5000 => "ODErrorCredentialsInvalid",
        5001 => "ODErrorCredentialsInvalidComputer",
        5100 => "ODErrorCredentialsMethodNotSupported",
        5101 => "ODErrorCredentialsNotAuthorized",
        5102 => "ODErrorCredentialsParameterError",
        5103 => "ODErrorCredentialsOperationFailed",
        5200 => "ODErrorCredentialsServerUnreachable",
        5201 => "ODErrorCredentialsServerNotFound",
        5202 => "ODErrorCredentialsServerError",
        5203 => "ODErrorCredentialsServerTimeout",
        5204 => "ODErrorCredentialsContactPrimary",
        5205 => "ODErrorCredentialsServerCommunicationError",
        5300 => "ODErrorCredentialsAccountNotFound",
        5301 => "ODErrorCredentialsAccountDisabled",
        5302 => "ODErrorCredentialsAccountExpired",
        5303 => "ODErrorCredentialsAccountInactive",
        5304 => "ODErrorCredentialsAccountTemporarilyLocked",
        5305 => "ODErrorCredentialsAccountLocked",
        5400 => "ODErrorCredentialsPasswordExpired",
        5401 => "ODErrorCredentialsPasswordChangeRequired",
        5402 => "ODErrorCredentialsPasswordQualityFailed",
        5403 => "ODErrorCredentialsPasswordTooShort",
        5404 => "ODErrorCredentialsPasswordTooLong",
        5405 => "ODErrorCredentialsPasswordNeedsLetter",
        5406 => "ODErrorCredentialsPasswordNeedsDigit",
        5407 => "ODErrorCredentialsPasswordChangeTooSoon",
        5408 => "ODErrorCredentialsPasswordUnrecoverable",
        10000 => "ODErrorPluginOperationNotSupported",
        10001 => "ODErrorPluginError",
        10002 => "ODErrorPluginOperationTimeout",
        _ => return Some(format!("Unknown ODError: {code}")),
    };
    Some(message.to_string())
}

/// `%{odtypes:mbridtype}d`: membership identifier kinds
pub(crate) fn member_id_type(argument: &Argument) -> Option<String> {
    let value = argument.as_u64()?;
    let name = match value {
        0 => "UID",
        1 => "GID",
        3 => "SID",
        4 => "USERNAME",
        5 => "GROUPNAME",
        6 => "UUID",
        7 => "GROUP NFS",
        8 => "USER NFS",
        10 => "GSS EXPORT NAME",
        11 => "X509 DN",
        12 => "KERBEROS",
        _ => return Some(format!("Unknown membership type: {value}")),
    };
    Some(name.to_string())
}

/// `%{odtypes:mbr_details}.*P`: a membership record (kind byte, 32-bit id,
/// then the source domain path)
pub(crate) fn member_details(argument: &Argument) -> Option<String> {
    let ArgValue::Bytes(bytes) = &argument.value else {
        return None;
    };
    if bytes.len() < 5 {
        return None;
    }

    const USER_KIND: u8 = 0x23;
    const GROUP_KIND: u8 = 0x24;
    let kind = match bytes[0] {
        USER_KIND => "user",
        GROUP_KIND => "group",
        other => return Some(format!("Unknown membership details kind: {other:#x}")),
    };

    let id = i32::from_le_bytes(bytes[1..5].try_into().ok()?);
    let (_, domain) = extract_string(&bytes[5..]).ok()?;
    Some(format!("{kind}: {id}@{domain}"))
}

/// `%{odtypes:nt_sid_t}.*P`: a Windows style security identifier
pub(crate) fn sid_string(argument: &Argument) -> Option<String> {
    let ArgValue::Bytes(bytes) = &argument.value else {
        return None;
    };
    if bytes.len() < 8 {
        return None;
    }

    let revision = bytes[0];
    let sub_authority_count = usize::from(bytes[1]);
    // 6-byte big-endian identifier authority
    let mut authority: u64 = 0;
    for byte in &bytes[2..8] {
        authority = (authority << 8) | u64::from(*byte);
    }

    let mut sid = format!("S-{revision}-{authority}");
    let mut offset = 8;
    for _ in 0..sub_authority_count {
        if offset + 4 > bytes.len() {
            break;
        }
        let sub = u32::from_le_bytes(bytes[offset..offset + 4].try_into().ok()?);
        sid.push_str(&format!("-{sub}"));
        offset += 4;
    }
    Some(sid)
}
