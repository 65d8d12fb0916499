// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::doc_markdown,
    clippy::needless_continue,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::fn_params_excessive_bools,
    clippy::inefficient_to_string,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    rust_2018_idioms,
    future_incompatible
)]
#![deny(
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::cast_ptr_alignment,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::unnecessary_cast
)]

//! # A library to parse Apple Unified Logs
//! `aulogs` decodes the binary artifacts of Apple's Unified Logging system
//! (tracev3 streams, uuidtext/dsc string catalogs, timesync databases) into
//! fully interpreted log records. No Apple APIs are used, so logs collected
//! from a macOS system or a `.logarchive` can be examined on any platform.
//!
//! ## Example
//! ```no_run
//! use aulogs::parser::{
//!     build_log, collect_strings, collect_timesync, find_tracev3_files, parse_tracev3,
//! };
//! use std::path::Path;
//!
//! let archive = Path::new("/path/to/system_logs.logarchive");
//! let catalog = collect_strings(archive).unwrap();
//! let timesync = collect_timesync(&archive.join("timesync")).unwrap();
//!
//! for tracev3_path in find_tracev3_files(archive) {
//!     let trace = parse_tracev3(&tracev3_path).unwrap();
//!     let records = build_log(&trace, &catalog, &timesync).unwrap();
//!     println!("{} records from {}", records.len(), tracev3_path.display());
//! }
//! ```

/// The uuidtext/dsc string store shared by all decoders
pub mod catalog;
mod decoders;
/// Functions to parse the shared string cache files
pub mod dsc;
/// Assembles log records from decoded chunks
pub mod emit;
pub mod error;
/// Functions to assemble the log message from format strings and arguments
pub mod message;
/// Top-level helpers to collect inputs and drive parses
pub mod parser;
mod reader;
/// The log record schema handed to output sinks
pub mod record;
/// Functions to parse time data associated with the Unified Log
pub mod timesync;
/// Functions to parse tracev3 files
pub mod tracev3;
/// Functions to parse the per-binary log string files
pub mod uuidtext;

pub use error::LogError;
pub use record::{LogLevel, LogRecord, RecordSink, SignpostKind, VecSink};
pub use reader::unixepoch_to_iso;
