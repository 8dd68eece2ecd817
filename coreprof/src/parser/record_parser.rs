//! Line → [`Record`] conversion
//!
//! The parser is a pure function of one line. Patterns are tried in a fixed
//! order and the first match wins; the two sample records come first because
//! they make up the bulk of every trace.
//!
//! A line that matches no pattern becomes [`Record::Unrecognized`]. So does a
//! line that matches structurally but carries a number too large for its
//! field; that case is logged since the producer should never emit it.

use log::warn;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use coreprof_common::{
    AllocationEntry, AllocationSampleRecord, AppDomainCreated, AppDomainId, AssemblyId,
    AssemblyLoaded, ClassId, ClassLoaded, CodeGroup, CodeRange, FunctionCode, FunctionId,
    FunctionNamed, GcItem, GcSampleRecord, LineMapping, ModuleId, ModuleLoaded, PrefixIp, Record,
    SampleFrame, SourceFileId, SourceLineInfo, StackSampleRecord, ThreadId,
};

use super::patterns;

type Builder = fn(&Captures<'_>) -> Option<Record>;

struct LinePattern {
    tag: &'static str,
    regex: &'static LazyLock<Regex>,
    build: Builder,
}

/// Ordered pattern table; sample records first
static LINE_PATTERNS: [LinePattern; 21] = [
    LinePattern { tag: "sam str", regex: &patterns::STACK_SAMPLE, build: stack_sample },
    LinePattern { tag: "sam mem", regex: &patterns::ALLOCATION_SAMPLE, build: allocation_sample },
    LinePattern { tag: "gch alt", regex: &patterns::GC_SAMPLE, build: gc_sample },
    LinePattern { tag: "thr cpu", regex: &patterns::THREAD_CPU, build: thread_cpu },
    LinePattern { tag: "prc cpu", regex: &patterns::PROCESS_CPU, build: process_cpu },
    LinePattern { tag: "fun cmf", regex: &patterns::FUNCTION_COMPILED, build: function_compiled },
    LinePattern { tag: "fun csf", regex: &patterns::CACHED_FUNCTION_FOUND, build: cached_function },
    LinePattern { tag: "fun nam", regex: &patterns::FUNCTION_NAMED, build: function_named },
    LinePattern { tag: "lin src", regex: &patterns::SOURCE_LINE, build: source_line },
    LinePattern { tag: "fil src", regex: &patterns::SOURCE_FILE, build: source_file },
    LinePattern { tag: "cls ldf", regex: &patterns::CLASS_LOADED, build: class_loaded },
    LinePattern { tag: "cls nam", regex: &patterns::CLASS_NAMED, build: class_named },
    LinePattern { tag: "mod ldf", regex: &patterns::MODULE_LOADED, build: module_loaded },
    LinePattern { tag: "mod ata", regex: &patterns::MODULE_ATTACHED, build: module_attached },
    LinePattern { tag: "asm ldf", regex: &patterns::ASSEMBLY_LOADED, build: assembly_loaded },
    LinePattern { tag: "apd crf", regex: &patterns::APP_DOMAIN_CREATED, build: app_domain_created },
    LinePattern { tag: "thr crt", regex: &patterns::THREAD_CREATED, build: thread_created },
    LinePattern { tag: "thr dst", regex: &patterns::THREAD_DESTROYED, build: thread_destroyed },
    LinePattern { tag: "thr aos", regex: &patterns::THREAD_OS_ASSIGNED, build: thread_os_assigned },
    LinePattern { tag: "prf tps", regex: &patterns::TIMESTAMP_SCALE, build: timestamp_scale },
    LinePattern { tag: "prf trs", regex: &patterns::TIME_REFERENCE, build: time_reference },
];

/// Parse one trace line into a typed record
///
/// Never fails: unknown or malformed lines come back as
/// [`Record::Unrecognized`] holding the line without its trailing whitespace.
#[must_use]
pub fn parse_line(line: &str) -> Record {
    let line = line.trim_end();

    for pattern in &LINE_PATTERNS {
        let Some(caps) = pattern.regex.captures(line) else {
            continue;
        };
        if let Some(record) = (pattern.build)(&caps) {
            return record;
        }
        warn!("Numeric field out of range in '{}' record: {line}", pattern.tag);
        break;
    }

    Record::Unrecognized(line.to_string())
}

// ============================================================================
// Field helpers
// ============================================================================

fn text<'h>(caps: &Captures<'h>, index: usize) -> Option<&'h str> {
    caps.get(index).map(|m| m.as_str())
}

fn hex(caps: &Captures<'_>, index: usize) -> Option<u64> {
    u64::from_str_radix(text(caps, index)?, 16).ok()
}

fn hex32(caps: &Captures<'_>, index: usize) -> Option<u32> {
    u32::from_str_radix(text(caps, index)?, 16).ok()
}

fn dec(caps: &Captures<'_>, index: usize) -> Option<u64> {
    text(caps, index)?.parse().ok()
}

fn dec32(caps: &Captures<'_>, index: usize) -> Option<u32> {
    text(caps, index)?.parse().ok()
}

/// Optional hex field: `Some(None)` when absent, `None` when it overflows
fn optional_hex(caps: &Captures<'_>, index: usize) -> Option<Option<u64>> {
    match caps.get(index) {
        None => Some(None),
        Some(m) => u64::from_str_radix(m.as_str(), 16).ok().map(Some),
    }
}

/// Quoted-or-bare name captured as two alternative groups
fn name(caps: &Captures<'_>, quoted: usize, bare: usize) -> String {
    text(caps, quoted).or_else(|| text(caps, bare)).unwrap_or_default().to_string()
}

/// Split a captured tail with its item pattern
fn items<T>(
    caps: &Captures<'_>,
    index: usize,
    item: &Regex,
    build: impl Fn(&Captures<'_>) -> Option<T>,
) -> Option<Vec<T>> {
    let Some(tail) = text(caps, index) else {
        return Some(Vec::new());
    };
    item.captures_iter(tail).map(|c| build(&c)).collect()
}

fn code_groups(caps: &Captures<'_>, index: usize) -> Option<Vec<CodeGroup>> {
    items(caps, index, &patterns::CODE_GROUP_ITEM, |c| match c.get(3) {
        None => Some(CodeGroup::Range(CodeRange { start: hex(c, 1)?, size: hex(c, 2)? })),
        Some(_) => Some(CodeGroup::Mapping(LineMapping {
            native_offset: hex(c, 1)?,
            line: hex32(c, 2)?,
            column: hex32(c, 3)?,
        })),
    })
}

// ============================================================================
// Record builders
// ============================================================================

fn stack_sample(caps: &Captures<'_>) -> Option<Record> {
    let prefix_ip = match (caps.get(6), caps.get(7)) {
        (None, _) => PrefixIp::Absent,
        (Some(_), None) => PrefixIp::Empty,
        (Some(_), Some(_)) => PrefixIp::Address(hex(caps, 7)?),
    };
    let frames = items(caps, 8, &patterns::STACK_FRAME_ITEM, |c| {
        Some(SampleFrame { function_id: FunctionId(hex(c, 1)?), ip: optional_hex(c, 2)? })
    })?;

    Some(Record::StackSample(StackSampleRecord {
        thread_id: ThreadId(hex(caps, 1)?),
        timestamp: dec(caps, 2)?,
        count: dec(caps, 3)?,
        match_prefix: dec32(caps, 4)?,
        stack_size: dec32(caps, 5)?,
        prefix_ip,
        frames,
    }))
}

fn allocation_sample(caps: &Captures<'_>) -> Option<Record> {
    let allocations = items(caps, 3, &patterns::ALLOCATION_ITEM, |c| {
        Some(AllocationEntry {
            class_id: ClassId(hex(c, 1)?),
            count: dec(c, 2)?,
            size: dec(c, 3)?,
            ip: optional_hex(c, 4)?,
        })
    })?;

    Some(Record::AllocationSample(AllocationSampleRecord {
        thread_id: ThreadId(hex(caps, 1)?),
        timestamp: dec(caps, 2)?,
        allocations,
    }))
}

fn gc_sample(caps: &Captures<'_>) -> Option<Record> {
    let items = items(caps, 2, &patterns::GC_ITEM, |c| {
        Some(GcItem { class_id: ClassId(hex(c, 1)?), count: dec(c, 2)?, size: dec(c, 3)? })
    })?;
    Some(Record::GarbageCollectionSample(GcSampleRecord { timestamp: dec(caps, 1)?, items }))
}

fn thread_cpu(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ThreadCpuTimes {
        id: ThreadId(hex(caps, 1)?),
        timestamp: dec(caps, 2)?,
        cpu_time: dec(caps, 3)?,
    })
}

fn process_cpu(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::CpuUsage { timestamp: dec(caps, 1)?, cpu_time: dec(caps, 2)? })
}

fn function_compiled(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::FunctionCompiled(FunctionCode {
        id: FunctionId(hex(caps, 1)?),
        class_id: ClassId(hex(caps, 2)?),
        module_id: ModuleId(hex(caps, 3)?),
        token: hex(caps, 4)?,
        runtime_id: hex(caps, 5)?,
        status: Some(hex(caps, 6)?),
        groups: code_groups(caps, 7)?,
    }))
}

fn cached_function(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::CachedFunctionFound(FunctionCode {
        id: FunctionId(hex(caps, 1)?),
        class_id: ClassId(hex(caps, 2)?),
        module_id: ModuleId(hex(caps, 3)?),
        token: hex(caps, 4)?,
        runtime_id: hex(caps, 5)?,
        status: None,
        groups: code_groups(caps, 6)?,
    }))
}

fn function_named(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::FunctionNamed(FunctionNamed {
        id: FunctionId(hex(caps, 1)?),
        name: text(caps, 2)?.to_string(),
        return_type: text(caps, 3)?.to_string(),
        signature: text(caps, 4)?.to_string(),
    }))
}

fn source_line(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::SourceLineInfo(SourceLineInfo {
        id: hex(caps, 1)?,
        file_id: SourceFileId(hex(caps, 2)?),
        function_id: FunctionId(hex(caps, 3)?),
        start_line: dec32(caps, 4)?,
        start_column: dec32(caps, 5)?,
        end_line: dec32(caps, 6)?,
        end_column: dec32(caps, 7)?,
    }))
}

fn source_file(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::SourceFileInfo {
        id: SourceFileId(hex(caps, 1)?),
        name: text(caps, 2)?.to_string(),
    })
}

fn class_loaded(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ClassLoaded(ClassLoaded {
        id: ClassId(hex(caps, 1)?),
        module_id: ModuleId(hex(caps, 2)?),
        runtime_id: hex(caps, 3)?,
        token: hex(caps, 4)?,
        status: hex(caps, 5)?,
    }))
}

fn class_named(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ClassNamed { id: ClassId(hex(caps, 1)?), name: text(caps, 2)?.to_string() })
}

fn module_loaded(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ModuleLoaded(ModuleLoaded {
        id: ModuleId(hex(caps, 1)?),
        assembly_id: AssemblyId(hex(caps, 2)?),
        base_address: hex(caps, 3)?,
        status: hex(caps, 4)?,
        name: text(caps, 5)?.to_string(),
    }))
}

fn module_attached(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ModuleAttachedToAssembly {
        module_id: ModuleId(hex(caps, 1)?),
        assembly_id: AssemblyId(hex(caps, 2)?),
    })
}

fn assembly_loaded(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::AssemblyLoaded(AssemblyLoaded {
        id: AssemblyId(hex(caps, 1)?),
        domain_id: AppDomainId(hex(caps, 2)?),
        module_id: ModuleId(hex(caps, 3)?),
        name: name(caps, 4, 5),
    }))
}

fn app_domain_created(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ApplicationDomainCreated(AppDomainCreated {
        id: AppDomainId(hex(caps, 1)?),
        runtime_id: hex(caps, 2)?,
        status: hex(caps, 3)?,
        name: name(caps, 4, 5),
    }))
}

fn thread_created(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ThreadCreated { id: ThreadId(hex(caps, 1)?), runtime_id: hex(caps, 2)? })
}

fn thread_destroyed(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ThreadDestroyed { id: ThreadId(hex(caps, 1)?) })
}

fn thread_os_assigned(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ThreadAssignedToOsThread {
        id: ThreadId(hex(caps, 1)?),
        os_thread_id: dec32(caps, 2)?,
    })
}

fn timestamp_scale(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ProfilerTimestampScale { ticks_per_second: dec(caps, 1)? })
}

fn time_reference(caps: &Captures<'_>) -> Option<Record> {
    Some(Record::ProfilerTimeReference { reference: dec(caps, 1)? })
}
