// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! Assembles `LogRecord`s from decoded tracev3 data, the string catalogs,
//! and the timesync store.

use crate::catalog::{ResolvedFormat, StringCatalog};
use crate::error::LogError;
use crate::message::format_log_message;
use crate::record::{LogLevel, LogRecord, RecordSink, SignpostKind, VecSink};
use crate::timesync::TimesyncDb;
use crate::tracev3::catalog::ProcessInfo;
use crate::tracev3::firehose::args::Argument;
use crate::tracev3::firehose::flags::FormatSource;
use crate::tracev3::firehose::{activity_type, EntryPayload, FirehoseEntry, FirehosePage};
use crate::tracev3::{CatalogBlock, TraceData};
use log::warn;
use regex::Regex;

/// Combines firehose fields, catalog names, timesync wall clocks, and the
/// interpolated message into `LogRecord`s handed to a sink
pub struct RecordAssembler<'a> {
    catalog: &'a StringCatalog,
    timesync: &'a TimesyncDb,
    conversion_re: Regex,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(
        catalog: &'a StringCatalog,
        timesync: &'a TimesyncDb,
    ) -> Result<Self, regex::Error> {
        Ok(RecordAssembler {
            catalog,
            timesync,
            conversion_re: crate::message::conversion_regex()?,
        })
    }

    /// Emit every record of a decoded tracev3 file in file order
    pub fn emit(&self, trace: &TraceData, sink: &mut dyn RecordSink) {
        let boot_uuid = trace
            .context
            .as_ref()
            .map(|context| context.boot_uuid.clone())
            .unwrap_or_default();
        let timezone_name = trace
            .context
            .as_ref()
            .map(|context| context.timezone_name())
            .unwrap_or_default();

        for block in &trace.blocks {
            for page in &block.firehose {
                for entry in &page.entries {
                    let record =
                        self.assemble_entry(trace, block, page, entry, &boot_uuid, &timezone_name);
                    sink.emit(record);
                }
            }
            for simpledump in &block.simpledump {
                sink.emit(self.assemble_simpledump(simpledump, &boot_uuid, &timezone_name));
            }
            for statedump in &block.statedump {
                sink.emit(self.assemble_statedump(statedump, &boot_uuid, &timezone_name));
            }
        }
    }

    /// Convenience wrapper collecting all records into a vector
    pub fn collect(&self, trace: &TraceData) -> Vec<LogRecord> {
        let mut sink = VecSink::default();
        self.emit(trace, &mut sink);
        sink.records
    }

    fn wall_time(&self, boot_uuid: &str, continuous_time: u64) -> i64 {
        match self.timesync.to_wall_ns(boot_uuid, continuous_time) {
            Ok(wall) => wall,
            Err(LogError::UnknownBoot(uuid)) => {
                warn!("[aulogs] No timesync data for boot UUID {uuid}");
                0
            }
            Err(_) => 0,
        }
    }

    fn assemble_entry(
        &self,
        trace: &TraceData,
        block: &CatalogBlock,
        page: &FirehosePage,
        entry: &FirehoseEntry,
        boot_uuid: &str,
        timezone_name: &str,
    ) -> LogRecord {
        let continuous_time = entry.continuous_time(page.base_continuous_time);
        let snapshot = block.snapshot.as_ref();
        let process = snapshot.and_then(|snapshot| {
            snapshot.process_info(page.proc_id_1, page.proc_id_2)
        });

        let mut record = LogRecord {
            wall_time_ns: self.wall_time(boot_uuid, continuous_time),
            thread_id: entry.thread_id,
            pid: process.map(|info| info.pid).unwrap_or_default(),
            euid: process.map(|info| info.euid).unwrap_or_default(),
            boot_uuid: boot_uuid.to_string(),
            timezone_name: timezone_name.to_string(),
            backtrace: entry.message.backtrace.clone(),
            ..Default::default()
        };

        let common = entry.payload.common();

        // Resolve the log site to a format string and sender image
        let resolved = self.resolve_entry_format(entry, process);
        record.raw_message = resolved.format_string.clone();
        record.sender_name = resolved.library_path.clone();
        record.sender_uuid = resolved.library_uuid.clone();
        record.proc_uuid = process
            .map(|info| info.main_uuid.clone())
            .unwrap_or_default();
        record.proc_name = self
            .catalog
            .image_path(&record.proc_uuid)
            .unwrap_or_else(|| resolved.library_path.clone());

        if let Some(common) = common {
            if let Some(subsystem_id) = common.subsystem_id {
                if let Some(snapshot) = snapshot {
                    match snapshot.subsystem(page.proc_id_1, page.proc_id_2, subsystem_id) {
                        Some((subsystem, category)) => {
                            record.subsystem = subsystem;
                            record.category = category;
                        }
                        None => warn!(
                            "[aulogs] Did not find subsystem {subsystem_id} in the catalog"
                        ),
                    }
                }
            }
        }

        // Out-of-line arguments replace the inline stream
        let oversize_args;
        let args: &[Argument] = match common.and_then(|common| common.data_ref) {
            Some(data_ref) => {
                match trace
                    .oversize
                    .arguments(page.proc_id_1, page.proc_id_2, u32::from(data_ref))
                {
                    Some(found) => found,
                    None => {
                        oversize_args = Vec::new();
                        &oversize_args
                    }
                }
            }
            None => &entry.message.args,
        };

        record.message = format_log_message(
            &resolved.format_string,
            args,
            entry.flags.has_private_data(),
            &self.conversion_re,
        );

        match &entry.payload {
            EntryPayload::Activity(activity) => {
                record.level = LogLevel::Activity;
                record.activity_id = activity.activity_id;
                record.parent_activity_id =
                    activity.common.current_aid.unwrap_or_default();
            }
            EntryPayload::Log(log_entry) => {
                record.level = LogLevel::from_log_type(entry.log_type);
                record.activity_id = log_entry.common.current_aid.unwrap_or_default();
            }
            EntryPayload::Trace(trace_entry) => {
                record.level = LogLevel::Default;
                record.activity_id = trace_entry.common.current_aid.unwrap_or_default();
            }
            EntryPayload::Signpost(signpost) => {
                record.level = LogLevel::Signpost;
                record.signpost_kind = Some(SignpostKind::from_log_type(entry.log_type));
                record.trace_id = signpost.signpost_id;
                record.activity_id = signpost.common.current_aid.unwrap_or_default();
                if let Some(name_location) = signpost.common.signpost_name_location {
                    let name = self.resolve_format_at(
                        entry,
                        process,
                        u64::from(name_location),
                    );
                    record.signpost_name = name.format_string;
                }
            }
            EntryPayload::Loss(loss) => {
                record.level = LogLevel::Loss;
                record.message = format!(
                    "Lost {} log entries between continuous times {} and {}",
                    loss.count, loss.start_time, loss.end_time
                );
            }
        }

        record
    }

    fn resolve_entry_format(
        &self,
        entry: &FirehoseEntry,
        process: Option<&ProcessInfo>,
    ) -> ResolvedFormat {
        if entry.activity_type == activity_type::LOSS {
            return ResolvedFormat {
                format_string: String::new(),
                library_path: String::new(),
                library_uuid: String::new(),
                error: None,
            };
        }
        self.resolve_format_at(entry, process, u64::from(entry.format_string_location))
    }

    // Pick the catalog file for the entry's lookup scheme and resolve an
    // offset inside it
    fn resolve_format_at(
        &self,
        entry: &FirehoseEntry,
        process: Option<&ProcessInfo>,
        offset: u64,
    ) -> ResolvedFormat {
        let source = entry
            .payload
            .common()
            .map(|common| common.format_source.clone())
            .unwrap_or(FormatSource::MainExe);

        match source {
            FormatSource::MainExe | FormatSource::MainPlugin => {
                let uuid = process
                    .map(|info| info.main_uuid.clone())
                    .unwrap_or_default();
                self.catalog.resolve_fmt(&uuid, offset, false)
            }
            FormatSource::SharedCache => {
                let uuid = process
                    .map(|info| info.dsc_uuid.clone())
                    .unwrap_or_default();
                self.catalog.resolve_fmt(&uuid, offset, true)
            }
            FormatSource::UuidRelative(uuid) => self.catalog.resolve_fmt(&uuid, offset, false),
            FormatSource::Absolute { uuid_index } => {
                let uuid = process
                    .and_then(|info| info.uuids_used.get(usize::from(uuid_index)))
                    .map(|used| used.uuid.clone())
                    .unwrap_or_default();
                self.catalog.resolve_fmt(&uuid, offset, false)
            }
        }
    }

    fn assemble_simpledump(
        &self,
        simpledump: &crate::tracev3::simpledump::Simpledump,
        boot_uuid: &str,
        timezone_name: &str,
    ) -> LogRecord {
        LogRecord {
            wall_time_ns: self.wall_time(boot_uuid, simpledump.continuous_time),
            thread_id: simpledump.thread_id,
            level: LogLevel::Simpledump,
            pid: simpledump.proc_id_1 as u32,
            subsystem: simpledump.subsystem.clone(),
            message: simpledump.message.clone(),
            sender_uuid: simpledump.sender_uuid.clone(),
            boot_uuid: boot_uuid.to_string(),
            timezone_name: timezone_name.to_string(),
            ..Default::default()
        }
    }

    fn assemble_statedump(
        &self,
        statedump: &crate::tracev3::statedump::Statedump,
        boot_uuid: &str,
        timezone_name: &str,
    ) -> LogRecord {
        LogRecord {
            wall_time_ns: self.wall_time(boot_uuid, statedump.continuous_time),
            level: LogLevel::Statedump,
            activity_id: statedump.activity_id,
            pid: statedump.proc_id_1 as u32,
            sender_uuid: statedump.sender_uuid.clone(),
            message: format!(
                "title: {}\ndecoder library: {}\ndecoder type: {}\n{}",
                statedump.title,
                statedump.decoder_library,
                statedump.decoder_type,
                statedump.render_data()
            ),
            boot_uuid: boot_uuid.to_string(),
            timezone_name: timezone_name.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RecordAssembler;
    use crate::catalog::StringCatalog;
    use crate::dsc::SharedCache;
    use crate::record::LogLevel;
    use crate::timesync::{TimesyncBoot, TimesyncDb, TimesyncRecord};
    use crate::tracev3::TraceData;
    use crate::uuidtext::UuidText;

    pub(crate) fn test_timesync(boot_uuid: &str, numer: u32, denom: u32) -> TimesyncDb {
        TimesyncDb::from_boots(vec![TimesyncBoot {
            boot_uuid: boot_uuid.to_string(),
            header_size: 48,
            timebase_numerator: numer,
            timebase_denominator: denom,
            boot_wall_ns: 1_700_000_000_000_000_000,
            timezone_offset_mins: 0,
            daylight_savings: 0,
            records: vec![TimesyncRecord {
                flags: 0,
                continuous_time: 0,
                wall_time_ns: 1_700_000_000_000_000_000,
                gmt_offset_mins: 0,
                dst_flag: 0,
            }],
        }])
    }

    fn test_catalog() -> StringCatalog {
        let uuid_data = crate::uuidtext::tests::test_uuidtext_bytes(
            &[(0x100, b"hello %u\0value=%{private}u\0")],
            "/usr/libexec/testd",
        );
        let (_, mut uuidtext) = UuidText::parse(&uuid_data).unwrap();
        uuidtext.uuid = String::from("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

        StringCatalog::with_entries(vec![uuidtext], Vec::<SharedCache>::new())
    }

    fn minimal_trace() -> TraceData {
        use crate::tracev3::{catalog, firehose, header, tags, tests};

        let header_bytes =
            header::tests::test_header_bytes(0xB0000000000000000000000000000001, 125, 3);
        let catalog_bytes = catalog::tests::test_catalog_bytes(
            &[0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA],
            b"com.example.sub\0general\0",
            &[catalog::tests::TestProcess {
                proc_id_1: 163,
                proc_id_2: 4,
                pid: 42,
                euid: 0,
                main_uuid_index: 0,
                dsc_uuid_index: 0,
                uuids_used: Vec::new(),
                subsystems: vec![(1, 0, 16)],
            }],
        );

        let arg_stream = firehose::args::tests::test_arg_stream(&[(0x00, &7_u32.to_le_bytes())], &[]);
        let entry =
            firehose::tests::test_entry_bytes(0x4, 0x0, 0x2, 0x100, 0x1234, 1000, &arg_stream);
        let page = firehose::tests::test_page_bytes(163, 4, 0, &[entry], None);

        let mut file = tests::test_chunk(tags::HEADER, 0x11, &header_bytes);
        file.extend_from_slice(&tests::test_chunk(tags::CATALOG, 0x11, &catalog_bytes));
        let inner = tests::test_chunk(tags::FIREHOSE, 0, &page);
        file.extend_from_slice(&tests::test_chunkset(&inner));

        TraceData::parse(&file).unwrap()
    }

    #[test]
    fn test_assemble_minimal_log_record() {
        let catalog = test_catalog();
        let timesync = test_timesync("B0000000000000000000000000000001", 125, 3);
        let assembler = RecordAssembler::new(&catalog, &timesync).unwrap();

        let trace = minimal_trace();
        let records = assembler.collect(&trace);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.message, "hello 7");
        assert_eq!(record.raw_message, "hello %u");
        assert_eq!(record.pid, 42);
        assert_eq!(record.thread_id, 0x1234);
        // 1000 ticks * 125/3 = 41666 ns past the anchor
        assert_eq!(record.wall_time_ns, 1_700_000_000_000_041_666);
        assert_eq!(record.level, LogLevel::Default);
        assert_eq!(record.proc_name, "/usr/libexec/testd");
        assert_eq!(record.sender_name, "/usr/libexec/testd");
        assert_eq!(record.boot_uuid, "B0000000000000000000000000000001");
        assert_eq!(record.timezone_name, "New_York");
    }

    #[test]
    fn test_assemble_unknown_boot_recovers() {
        let catalog = test_catalog();
        let timesync = test_timesync("99999999999999999999999999999999", 1, 1);
        let assembler = RecordAssembler::new(&catalog, &timesync).unwrap();

        let trace = minimal_trace();
        let records = assembler.collect(&trace);
        // Record still emitted with a zero wall clock
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].wall_time_ns, 0);
        assert_eq!(records[0].message, "hello 7");
    }
}
