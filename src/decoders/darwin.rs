// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::Argument;

/// Darwin errno values to messages, from darwin-xnu bsd/sys/errno.h
pub(crate) fn errno_string(errno: u64) -> String {
    let message = match errno {
        0 => "Success",
        1 => "Operation not permitted",
        2 => "No such file or directory",
        3 => "No such process",
        4 => "Interrupted system call",
        5 => "Input/output error",
        6 => "Device not configured",
        7 => "Argument list too long",
        8 => "Exec format error",
        9 => "Bad file descriptor",
        10 => "No child processes",
        11 => "Resource deadlock avoided",
        12 => "Cannot allocate memory",
        13 => "Permission denied",
        14 => "Bad address",
        15 => "Block device required",
        16 => "Device / Resource busy",
        17 => "File exists",
        18 => "Cross-device link",
        19 => "Operation not supported by device",
        20 => "Not a directory",
        21 => "Is a directory",
        22 => "Invalid argument",
        23 => "Too many open files in system",
        24 => "Too many open files",
        25 => "Inappropriate ioctl for device",
        26 => "Text file busy",
        27 => "File too large",
        28 => "No space left on device",
        29 => "Illegal seek",
        30 => "Read-only file system",
        31 => "Too many links",
        32 => "Broken pipe",
        33 => "Numerical argument out of domain",
        34 => "Result too large",
        35 => "Resource temporarily unavailable",
        36 => "Operation now in progress",
        37 => "Operation already in progress",
        38 => "Socket operation on non-socket",
        39 => "Destination address required",
        40 => "Message too long",
        41 => "Protocol wrong type for socket",
        42 => "Protocol not available",
        43 => "Protocol not supported",
        44 => "Socket type not supported",
        45 => "Operation not supported",
        46 => "Protocol family not supported",
        47 => "Address family not supported by protocol family",
        48 => "Address already in use",
        49 => "Can't assign requested address",
        50 => "Network is down",
        51 => "Network is unreachable",
        52 => "Network dropped connection on reset",
        53 => "Software caused connection abort",
        54 => "Connection reset by peer",
        55 => "No buffer space available",
        56 => "Socket is already connected",
        57 => "Socket is not connected",
        58 => "Can't send after socket shutdown",
        59 => "Too many references: can't splice",
        60 => "Operation timed out",
        61 => "Connection refused",
        62 => "Too many levels of symbolic links",
        63 => "File name too long",
        64 => "Host is down",
        65 => "No route to host",
        66 => "Directory not empty",
        67 => "Too many processes",
        68 => "Too many users",
        69 => "Disc quota exceeded",
        70 => "Stale NFS file handle",
        _ => return format!("Unknown errno: {errno}"),
    };
    message.to_string()
}

/// `%{darwin.errno}d`
pub(crate) fn errno_message(argument: &Argument) -> Option<String> {
    let errno = argument.as_u64()?;
    Some(format!("[{errno}: {}]", errno_string(errno)))
}

/// `%{darwin.mode}d`: octal mode plus the `drwxr-xr-x` style string
pub(crate) fn permission_mode(argument: &Argument) -> Option<String> {
    let mode = argument.as_u64()?;

    const FILE_TYPE_MASK: u64 = 0o170000;
    let file_type = match mode & FILE_TYPE_MASK {
        0o010000 => "p",
        0o020000 => "c",
        0o040000 => "d",
        0o060000 => "b",
        0o120000 => "l",
        0o140000 => "s",
        _ => "-",
    };

    let mut rwx = String::new();
    for shift in [6_u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        rwx.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        rwx.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        rwx.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }

    Some(format!("{:o} ({file_type}{rwx})", mode & 0o7777))
}

/// `%{darwin.signal}d`
pub(crate) fn signal_name(argument: &Argument) -> Option<String> {
    let signal = argument.as_u64()?;
    let name = match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGEMT",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGBUS",
        11 => "SIGSEGV",
        12 => "SIGSYS",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        16 => "SIGURG",
        17 => "SIGSTOP",
        18 => "SIGTSTP",
        19 => "SIGCONT",
        20 => "SIGCHLD",
        21 => "SIGTTIN",
        22 => "SIGTTOU",
        23 => "SIGIO",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        26 => "SIGVTALRM",
        27 => "SIGPROF",
        28 => "SIGWINCH",
        29 => "SIGINFO",
        30 => "SIGUSR1",
        31 => "SIGUSR2",
        _ => return Some(format!("Unknown signal: {signal}")),
    };
    Some(format!("[sig{signal}: {name}]"))
}

/// `%{mach.errno}d`: kern_return_t values from mach/kern_return.h
pub(crate) fn mach_error(argument: &Argument) -> Option<String> {
    let code = argument.as_u64()?;
    let message = match code {
        0 => "KERN_SUCCESS",
        1 => "KERN_INVALID_ADDRESS",
        2 => "KERN_PROTECTION_FAILURE",
        3 => "KERN_NO_SPACE",
        4 => "KERN_INVALID_ARGUMENT",
        5 => "KERN_FAILURE",
        6 => "KERN_RESOURCE_SHORTAGE",
        7 => "KERN_NOT_RECEIVER",
        8 => "KERN_NO_ACCESS",
        9 => "KERN_MEMORY_FAILURE",
        10 => "KERN_MEMORY_ERROR",
        11 => "KERN_ALREADY_IN_SET",
        12 => "KERN_NOT_IN_SET",
        13 => "KERN_NAME_EXISTS",
        14 => "KERN_ABORTED",
        15 => "KERN_INVALID_NAME",
        16 => "KERN_INVALID_TASK",
        17 => "KERN_INVALID_RIGHT",
        18 => "KERN_INVALID_VALUE",
        19 => "KERN_UREFS_OVERFLOW",
        20 => "KERN_INVALID_CAPABILITY",
        21 => "KERN_RIGHT_EXISTS",
        22 => "KERN_INVALID_HOST",
        23 => "KERN_MEMORY_PRESENT",
        24 => "KERN_MEMORY_DATA_MOVED",
        25 => "KERN_MEMORY_RESTART_COPY",
        26 => "KERN_INVALID_PROCESSOR_SET",
        27 => "KERN_POLICY_LIMIT",
        28 => "KERN_INVALID_POLICY",
        29 => "KERN_INVALID_OBJECT",
        30 => "KERN_ALREADY_WAITING",
        31 => "KERN_DEFAULT_SET",
        32 => "KERN_EXCEPTION_PROTECTED",
        33 => "KERN_INVALID_LEDGER",
        34 => "KERN_INVALID_MEMORY_CONTROL",
        35 => "KERN_INVALID_SECURITY",
        36 => "KERN_NOT_DEPRESSED",
        37 => "KERN_TERMINATED",
        38 => "KERN_LOCK_SET_DESTROYED",
        39 => "KERN_LOCK_UNSTABLE",
        40 => "KERN_LOCK_OWNED",
        41 => "KERN_LOCK_OWNED_SELF",
        42 => "KERN_SEMAPHORE_DESTROYED",
        43 => "KERN_RPC_SERVER_TERMINATED",
        44 => "KERN_RPC_TERMINATE_ORPHAN",
        45 => "KERN_RPC_CONTINUE_ORPHAN",
        46 => "KERN_NOT_SUPPORTED",
        47 => "KERN_NODE_DOWN",
        48 => "KERN_NOT_WAITING",
        49 => "KERN_OPERATION_TIMED_OUT",
        50 => "KERN_CODESIGN_ERROR",
        _ => return Some(format!("Unknown mach error: {code:#x}")),
    };
    Some(message.to_string())
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
    fn test_errno_message() {
        assert_eq!(
            errno_message(&scalar(2)).unwrap(),
            "[2: No such file or directory]"
        );
        assert_eq!(errno_message(&scalar(999)).unwrap(), "[999: Unknown errno: 999]");
    }

    #[test]
    fn test_permission_mode() {
        assert_eq!(permission_mode(&scalar(0o100755)).unwrap(), "755 (-rwxr-xr-x)");
        assert_eq!(permission_mode(&scalar(0o040700)).unwrap(), "700 (drwx------)");
    }

    #[test]
    fn test_signal_name() {
        assert_eq!(signal_name(&scalar(9)).unwrap(), "[sig9: SIGKILL]");
        assert_eq!(signal_name(&scalar(11)).unwrap(), "[sig11: SIGSEGV]");
    }

    #[test]
    fn test_mach_error() {
        assert_eq!(mach_error(&scalar(0)).unwrap(), "KERN_SUCCESS");
        assert_eq!(mach_error(&scalar(5)).unwrap(), "KERN_FAILURE");
    }
}
