// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::tracev3::firehose::args::BacktraceFrame;
use serde::Serialize;

/// Interpreted level of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum LogLevel {
    #[default]
    Default,
    Info,
    Debug,
    Error,
    Fault,
    Activity,
    Signpost,
    Loss,
    Simpledump,
    Statedump,
}

impl LogLevel {
    /// Map a firehose log type byte for log entries (activity type 0x4)
    pub(crate) fn from_log_type(log_type: u8) -> LogLevel {
        match log_type {
            0x01 => LogLevel::Info,
            0x02 => LogLevel::Debug,
            0x10 => LogLevel::Error,
            0x11 => LogLevel::Fault,
            _ => LogLevel::Default,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Default => "Default",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Error => "Error",
            LogLevel::Fault => "Fault",
            LogLevel::Activity => "Activity",
            LogLevel::Signpost => "Signpost",
            LogLevel::Loss => "Loss",
            LogLevel::Simpledump => "Simpledump",
            LogLevel::Statedump => "Statedump",
        };
        write!(f, "{name}")
    }
}

/// Signpost flavor, from the log type byte of a signpost entry. Scopes not
/// yet observed keep the raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignpostKind {
    ProcessEvent,
    ProcessStart,
    ProcessEnd,
    ThreadEvent,
    ThreadStart,
    ThreadEnd,
    SystemEvent,
    SystemStart,
    SystemEnd,
    Unknown(u8),
}

impl SignpostKind {
    pub(crate) fn from_log_type(log_type: u8) -> SignpostKind {
        match log_type {
            0x80 => SignpostKind::ProcessEvent,
            0x81 => SignpostKind::ProcessStart,
            0x82 => SignpostKind::ProcessEnd,
            0x40 => SignpostKind::ThreadEvent,
            0x41 => SignpostKind::ThreadStart,
            0x42 => SignpostKind::ThreadEnd,
            0xc0 => SignpostKind::SystemEvent,
            0xc1 => SignpostKind::SystemStart,
            0xc2 => SignpostKind::SystemEnd,
            other => SignpostKind::Unknown(other),
        }
    }
}

/// One fully interpreted log entry, the contract to output sinks.
/// Timestamps are nanoseconds since UNIXEPOCH (UTC)
#[derive(Debug, Clone, Serialize, Default)]
pub struct LogRecord {
    pub wall_time_ns: i64,
    pub thread_id: u64,
    pub level: LogLevel,
    pub activity_id: u64,
    pub parent_activity_id: u64,
    pub trace_id: u64,
    pub pid: u32,
    pub euid: u32,
    pub proc_name: String,
    pub proc_uuid: String,
    pub sender_name: String,
    pub sender_uuid: String,
    pub subsystem: String,
    pub category: String,
    pub message: String,
    /// The unformatted base string the message was built from
    pub raw_message: String,
    pub signpost_name: String,
    pub signpost_kind: Option<SignpostKind>,
    pub backtrace: Vec<BacktraceFrame>,
    pub boot_uuid: String,
    pub timezone_name: String,
}

/// Consumes assembled records. Output formatters (TSV, SQLite, JSON) live
/// outside the core and implement this
pub trait RecordSink {
    fn emit(&mut self, record: LogRecord);
}

/// Collects records into memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<LogRecord>,
}

impl RecordSink for VecSink {
    fn emit(&mut self, record: LogRecord) {
        self.records.push(record);
    }
}
