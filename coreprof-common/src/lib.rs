//! # Shared Record Model (Trace Producer ↔ Analyzer)
//!
//! Defines the typed records produced by the Core Profiler trace parser and
//! the identifiers shared by every stage of the analyzer. One text line of a
//! trace becomes exactly one [`Record`]; records are consumed immediately by
//! the event processor and then discarded.
//!
//! ## Identifiers
//!
//! Every entity in a trace (function, class, module, thread, ...) carries an
//! *internal id*: a 64-bit value assigned sequentially by the trace producer,
//! stable for the duration of one trace and never reused. Internal ids are
//! distinct from the managed runtime ids that some records also carry.
//!
//! ## Canonical form
//!
//! Every record implements [`fmt::Display`], which writes the record back in
//! canonical wire form (lowercase hex, `0x` prefixed). Parsing a canonical
//! line and displaying the result reproduces the line exactly.

use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! internal_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:x}", self.0)
            }
        }
    };
}

internal_id!(
    /// Application domain internal id
    AppDomainId
);
internal_id!(
    /// Assembly internal id
    AssemblyId
);
internal_id!(
    /// Module internal id
    ModuleId
);
internal_id!(
    /// Class internal id
    ClassId
);
internal_id!(
    /// Function internal id
    ///
    /// [`FAKE_FUNCTION_ID`] is reserved for the synthetic root of every
    /// per-thread call tree.
    FunctionId
);
internal_id!(
    /// Source file internal id
    SourceFileId
);
internal_id!(
    /// Interned source line id
    ///
    /// Unlike the other ids this one is assigned by the analyzer, lazily, the
    /// first time a line is referenced. Until then a line carries
    /// [`UNDEFINED_SOURCE_LINE_ID`].
    SourceLineId
);
internal_id!(
    /// Managed thread internal id
    ThreadId
);

/// Function id of the synthetic root node of every call tree
pub const FAKE_FUNCTION_ID: FunctionId = FunctionId(u64::MAX);

/// Placeholder id for a source line that has not been interned yet
pub const UNDEFINED_SOURCE_LINE_ID: SourceLineId = SourceLineId(u64::MAX);

/// Line number the runtime emits for compiler-generated ("hidden") code
///
/// Sequence points carrying this value never resolve to a source line.
pub const HIDDEN_LINE_NUMBER: u32 = 0x00fe_efee;

// ============================================================================
// Record payloads
// ============================================================================

/// `apd crf` - application domain creation finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDomainCreated {
    pub id: AppDomainId,
    pub runtime_id: u64,
    pub status: u64,
    pub name: String,
}

/// `asm ldf` - assembly load finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyLoaded {
    pub id: AssemblyId,
    pub domain_id: AppDomainId,
    pub module_id: ModuleId,
    pub name: String,
}

/// `mod ldf` - module load finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLoaded {
    pub id: ModuleId,
    pub assembly_id: AssemblyId,
    pub base_address: u64,
    pub status: u64,
    pub name: String,
}

/// `cls ldf` - class load finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLoaded {
    pub id: ClassId,
    pub module_id: ModuleId,
    pub runtime_id: u64,
    pub token: u64,
    pub status: u64,
}

/// Native code range of a compiled function (`0xSTART:0xSIZE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CodeRange {
    pub start: u64,
    pub size: u64,
}

impl CodeRange {
    /// Returns true if `address` lies inside `[start, start + size)`
    #[must_use]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address - self.start < self.size
    }
}

/// Sequence point mapping a native offset to a line (`0xOFFSET:0xLINE:0xCOLUMN`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LineMapping {
    pub native_offset: u64,
    pub line: u32,
    pub column: u32,
}

impl LineMapping {
    /// Returns true if this mapping points at real source code
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.line != 0 && self.line != HIDDEN_LINE_NUMBER
    }
}

/// One trailing group of a `fun cmf` / `fun csf` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeGroup {
    Range(CodeRange),
    Mapping(LineMapping),
}

/// `fun cmf` (compiled) and `fun csf` (found in the native image cache)
///
/// Only compiled functions carry a status; cached ones have `status: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCode {
    pub id: FunctionId,
    pub class_id: ClassId,
    pub module_id: ModuleId,
    pub token: u64,
    pub runtime_id: u64,
    pub status: Option<u64>,
    pub groups: Vec<CodeGroup>,
}

/// `fun nam` - function naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNamed {
    pub id: FunctionId,
    pub name: String,
    pub return_type: String,
    pub signature: String,
}

/// `lin src` - source line declaration
///
/// `id` is the producer's line id. The analyzer interns lines under its own
/// [`SourceLineId`] space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLineInfo {
    pub id: u64,
    pub file_id: SourceFileId,
    pub function_id: FunctionId,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// Optional instruction pointer attached to the prefix of a stack sample
///
/// The wire format distinguishes "no marker", "empty marker" (`3:5:`) and an
/// address (`3:5:0x1f`); only the last one updates the unwound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixIp {
    #[default]
    Absent,
    Empty,
    Address(u64),
}

impl PrefixIp {
    #[must_use]
    pub fn address(self) -> Option<u64> {
        match self {
            PrefixIp::Address(ip) => Some(ip),
            PrefixIp::Absent | PrefixIp::Empty => None,
        }
    }
}

/// One newly pushed frame of a stack sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFrame {
    pub function_id: FunctionId,
    pub ip: Option<u64>,
}

/// `sam str` - delta-encoded stack sample
///
/// Frames `[0, match_prefix)` of the previous stack of the same thread are
/// kept, then `frames` are pushed. `stack_size` is the size of the new stack,
/// so `match_prefix + frames.len() == stack_size` for a consistent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSampleRecord {
    pub thread_id: ThreadId,
    pub timestamp: u64,
    pub count: u64,
    pub match_prefix: u32,
    pub stack_size: u32,
    pub prefix_ip: PrefixIp,
    pub frames: Vec<SampleFrame>,
}

/// One allocation entry of a `sam mem` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationEntry {
    pub class_id: ClassId,
    pub count: u64,
    pub size: u64,
    pub ip: Option<u64>,
}

/// `sam mem` - allocation sample, attributed to the current top of stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSampleRecord {
    pub thread_id: ThreadId,
    pub timestamp: u64,
    pub allocations: Vec<AllocationEntry>,
}

/// One class entry of a `gch alt` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GcItem {
    pub class_id: ClassId,
    pub count: u64,
    pub size: u64,
}

/// `gch alt` - heap snapshot taken after a garbage collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcSampleRecord {
    pub timestamp: u64,
    pub items: Vec<GcItem>,
}

// ============================================================================
// Record
// ============================================================================

/// A single parsed trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    ApplicationDomainCreated(AppDomainCreated),
    AssemblyLoaded(AssemblyLoaded),
    ModuleLoaded(ModuleLoaded),
    ModuleAttachedToAssembly { module_id: ModuleId, assembly_id: AssemblyId },
    ClassLoaded(ClassLoaded),
    ClassNamed { id: ClassId, name: String },
    FunctionCompiled(FunctionCode),
    CachedFunctionFound(FunctionCode),
    FunctionNamed(FunctionNamed),
    SourceLineInfo(SourceLineInfo),
    SourceFileInfo { id: SourceFileId, name: String },
    CpuUsage { timestamp: u64, cpu_time: u64 },
    ProfilerTimestampScale { ticks_per_second: u64 },
    ProfilerTimeReference { reference: u64 },
    ThreadCreated { id: ThreadId, runtime_id: u64 },
    ThreadDestroyed { id: ThreadId },
    ThreadAssignedToOsThread { id: ThreadId, os_thread_id: u32 },
    ThreadCpuTimes { id: ThreadId, timestamp: u64, cpu_time: u64 },
    StackSample(StackSampleRecord),
    AllocationSample(AllocationSampleRecord),
    GarbageCollectionSample(GcSampleRecord),
    /// Line that matched no known pattern (kept verbatim)
    Unrecognized(String),
}

impl Record {
    /// Short wire tag of the record (`"sam str"`, `"fun nam"`, ...)
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Record::ApplicationDomainCreated(_) => "apd crf",
            Record::AssemblyLoaded(_) => "asm ldf",
            Record::ModuleLoaded(_) => "mod ldf",
            Record::ModuleAttachedToAssembly { .. } => "mod ata",
            Record::ClassLoaded(_) => "cls ldf",
            Record::ClassNamed { .. } => "cls nam",
            Record::FunctionCompiled(_) => "fun cmf",
            Record::CachedFunctionFound(_) => "fun csf",
            Record::FunctionNamed(_) => "fun nam",
            Record::SourceLineInfo(_) => "lin src",
            Record::SourceFileInfo { .. } => "fil src",
            Record::CpuUsage { .. } => "prc cpu",
            Record::ProfilerTimestampScale { .. } => "prf tps",
            Record::ProfilerTimeReference { .. } => "prf trs",
            Record::ThreadCreated { .. } => "thr crt",
            Record::ThreadDestroyed { .. } => "thr dst",
            Record::ThreadAssignedToOsThread { .. } => "thr aos",
            Record::ThreadCpuTimes { .. } => "thr cpu",
            Record::StackSample(_) => "sam str",
            Record::AllocationSample(_) => "sam mem",
            Record::GarbageCollectionSample(_) => "gch alt",
            Record::Unrecognized(_) => "???",
        }
    }

    /// Returns true for lines that matched no pattern
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Record::Unrecognized(_))
    }
}

impl fmt::Display for CodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGroup::Range(r) => write!(f, "0x{:x}:0x{:x}", r.start, r.size),
            CodeGroup::Mapping(m) => {
                write!(f, "0x{:x}:0x{:x}:0x{:x}", m.native_offset, m.line, m.column)
            }
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        match self {
            Record::ApplicationDomainCreated(r) => write!(
                f,
                "{tag} {} 0x{:x} 0x{:x} {}",
                r.id, r.runtime_id, r.status, r.name
            ),
            Record::AssemblyLoaded(r) => {
                write!(f, "{tag} {} {} {} {}", r.id, r.domain_id, r.module_id, r.name)
            }
            Record::ModuleLoaded(r) => write!(
                f,
                "{tag} {} {} 0x{:x} 0x{:x} \"{}\"",
                r.id, r.assembly_id, r.base_address, r.status, r.name
            ),
            Record::ModuleAttachedToAssembly { module_id, assembly_id } => {
                write!(f, "{tag} {module_id} {assembly_id}")
            }
            Record::ClassLoaded(r) => write!(
                f,
                "{tag} {} {} 0x{:x} 0x{:x} 0x{:x}",
                r.id, r.module_id, r.runtime_id, r.token, r.status
            ),
            Record::ClassNamed { id, name } => write!(f, "{tag} {id} \"{name}\""),
            Record::FunctionCompiled(r) | Record::CachedFunctionFound(r) => {
                write!(
                    f,
                    "{tag} {} {} {} 0x{:x} 0x{:x}",
                    r.id, r.class_id, r.module_id, r.token, r.runtime_id
                )?;
                if let Some(status) = r.status {
                    write!(f, " 0x{status:x}")?;
                }
                for group in &r.groups {
                    write!(f, " {group}")?;
                }
                Ok(())
            }
            Record::FunctionNamed(r) => write!(
                f,
                "{tag} {} \"{}\" \"{}\" \"{}\"",
                r.id, r.name, r.return_type, r.signature
            ),
            Record::SourceLineInfo(r) => write!(
                f,
                "{tag} 0x{:x} {} {} {} {} {} {}",
                r.id,
                r.file_id,
                r.function_id,
                r.start_line,
                r.start_column,
                r.end_line,
                r.end_column
            ),
            Record::SourceFileInfo { id, name } => write!(f, "{tag} {id} \"{name}\""),
            Record::CpuUsage { timestamp, cpu_time } => write!(f, "{tag} {timestamp} {cpu_time}"),
            Record::ProfilerTimestampScale { ticks_per_second } => {
                write!(f, "{tag} {ticks_per_second}")
            }
            Record::ProfilerTimeReference { reference } => write!(f, "{tag} {reference}"),
            Record::ThreadCreated { id, runtime_id } => write!(f, "{tag} {id} 0x{runtime_id:x}"),
            Record::ThreadDestroyed { id } => write!(f, "{tag} {id}"),
            Record::ThreadAssignedToOsThread { id, os_thread_id } => {
                write!(f, "{tag} {id} {os_thread_id}")
            }
            Record::ThreadCpuTimes { id, timestamp, cpu_time } => {
                write!(f, "{tag} {id} {timestamp} {cpu_time}")
            }
            Record::StackSample(r) => {
                write!(
                    f,
                    "{tag} {} {} {} {}:{}",
                    r.thread_id, r.timestamp, r.count, r.match_prefix, r.stack_size
                )?;
                match r.prefix_ip {
                    PrefixIp::Absent => {}
                    PrefixIp::Empty => f.write_str(":")?,
                    PrefixIp::Address(ip) => write!(f, ":0x{ip:x}")?,
                }
                for frame in &r.frames {
                    write!(f, " {}", frame.function_id)?;
                    if let Some(ip) = frame.ip {
                        write!(f, ":0x{ip:x}")?;
                    }
                }
                Ok(())
            }
            Record::AllocationSample(r) => {
                write!(f, "{tag} {} {}", r.thread_id, r.timestamp)?;
                for entry in &r.allocations {
                    write!(f, " {}:{}:{}", entry.class_id, entry.count, entry.size)?;
                    if let Some(ip) = entry.ip {
                        write!(f, ":0x{ip:x}")?;
                    }
                }
                Ok(())
            }
            Record::GarbageCollectionSample(r) => {
                write!(f, "{tag} {}", r.timestamp)?;
                for item in &r.items {
                    write!(f, " {}:{}:{}", item.class_id, item.count, item.size)?;
                }
                Ok(())
            }
            Record::Unrecognized(line) => f.write_str(line),
        }
    }
}
