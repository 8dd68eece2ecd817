//! # Event Processing
//!
//! Consumes parsed records in stream order and routes them to the state they
//! update.
//!
//! ## Record Routing
//!
//! - Metadata (`apd`, `asm`, `mod`, `cls`, `fun`, `lin`, `fil`) → [`MetadataRegistry`]
//! - `sam str` → the thread's [`ThreadStack`](crate::stacks::ThreadStack), producing a resolved sample
//! - `sam mem` → allocation events attributed to the thread's current top of stack
//! - `gch alt` → [`GcHistory`]
//! - `prc cpu` / `thr cpu` → process and thread [`CpuHistory`]
//! - `prf tps` / `prf trs` → [`TimeScale`] used for every later timestamp
//!
//! Threads are created by `thr crt` or lazily by the first record that names
//! them. Per-record problems are counted in [`LoadDiagnostics`] and logged;
//! nothing here fails the load.

use std::collections::BTreeMap;

use coreprof_common::{AllocationSampleRecord, Record, StackSampleRecord, ThreadId};
use log::{debug, info, warn};

use super::diagnostics::LoadDiagnostics;
use super::model::TraceModel;
use super::thread::ThreadData;
use crate::config::AnalysisConfig;
use crate::domain::TimeScale;
use crate::history::{AllocationEvent, AllocationHistory, CpuHistory, GcHistory};
use crate::metadata::MetadataRegistry;

/// Encapsulates record processing logic and load state
pub struct EventProcessor {
    // Configuration
    config: AnalysisConfig,

    // Load state
    registry: MetadataRegistry,
    threads: BTreeMap<ThreadId, ThreadData>,
    process_cpu: CpuHistory,
    allocations: AllocationHistory,
    gc: GcHistory,
    time_scale: TimeScale,

    /// Per-record counters, filled as records are processed
    pub diagnostics: LoadDiagnostics,
}

impl EventProcessor {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let process_cpu = CpuHistory::new(config.core_count, config.cpu_overflow_threshold);
        Self {
            config,
            registry: MetadataRegistry::new(),
            threads: BTreeMap::new(),
            process_cpu,
            allocations: AllocationHistory::new(),
            gc: GcHistory::new(),
            time_scale: TimeScale::default(),
            diagnostics: LoadDiagnostics::default(),
        }
    }

    /// Process a single record
    pub fn process_record(&mut self, record: Record) {
        if record.is_unrecognized() {
            self.diagnostics.unrecognized_lines += 1;
        } else {
            self.diagnostics.records_parsed += 1;
        }

        match record {
            Record::ApplicationDomainCreated(domain) => self.registry.register_app_domain(&domain),
            Record::AssemblyLoaded(assembly) => self.registry.register_assembly(&assembly),
            Record::ModuleLoaded(module) => self.registry.register_module(&module),
            Record::ModuleAttachedToAssembly { module_id, assembly_id } => {
                self.registry.attach_module(module_id, assembly_id);
            }
            Record::ClassLoaded(class) => self.registry.register_class(&class),
            Record::ClassNamed { id, name } => self.registry.name_class(id, &name),
            Record::FunctionCompiled(code) => self.registry.register_function_code(&code, false),
            Record::CachedFunctionFound(code) => self.registry.register_function_code(&code, true),
            Record::FunctionNamed(named) => self.registry.name_function(&named),
            Record::SourceLineInfo(line) => self.registry.declare_source_line(&line),
            Record::SourceFileInfo { id, name } => self.registry.register_source_file(id, &name),
            Record::CpuUsage { timestamp, cpu_time } => {
                let timestamp = self.time_scale.to_millis(timestamp);
                self.process_cpu.record(timestamp, cpu_time);
            }
            Record::ProfilerTimestampScale { ticks_per_second } => {
                if ticks_per_second == 0 {
                    warn!("Ignoring zero timestamp scale");
                } else {
                    self.time_scale.ticks_per_second = ticks_per_second;
                }
            }
            Record::ProfilerTimeReference { reference } => self.time_scale.reference = reference,
            Record::ThreadCreated { id, runtime_id } => {
                self.thread_mut(id).runtime_id = Some(runtime_id);
            }
            Record::ThreadDestroyed { id } => self.thread_mut(id).destroyed = true,
            Record::ThreadAssignedToOsThread { id, os_thread_id } => {
                self.thread_mut(id).os_thread_id = Some(os_thread_id);
            }
            Record::ThreadCpuTimes { id, timestamp, cpu_time } => {
                let timestamp = self.time_scale.to_millis(timestamp);
                self.thread_mut(id).cpu.record(timestamp, cpu_time);
            }
            Record::StackSample(sample) => self.handle_stack_sample(&sample),
            Record::AllocationSample(sample) => self.handle_allocation_sample(&sample),
            Record::GarbageCollectionSample(sample) => {
                let timestamp = self.time_scale.to_millis(sample.timestamp);
                self.gc.record(timestamp, &sample.items);
            }
            Record::Unrecognized(line) => debug!("Unrecognized trace line: {line}"),
        }
    }

    /// Mark a profiling pause in every CPU series
    pub fn pause_profiling(&mut self) {
        self.process_cpu.mark_paused();
        for thread in self.threads.values_mut() {
            thread.cpu.mark_paused();
        }
    }

    /// Mark the end of a pause; the next CPU reading of each series may go backwards
    pub fn resume_profiling(&mut self) {
        self.process_cpu.mark_resumed();
        for thread in self.threads.values_mut() {
            thread.cpu.mark_resumed();
        }
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Freeze the load state into an immutable model
    #[must_use]
    pub fn finish(self, raw_lines: Option<Vec<String>>) -> TraceModel {
        info!(
            "Loaded trace: {} threads, {} functions, {} source lines ({})",
            self.threads.len(),
            self.registry.function_count(),
            self.registry.line_count(),
            self.diagnostics
        );
        if self.diagnostics.dropped_samples > 0 {
            warn!("{} stack samples were dropped; statistics are incomplete", self.diagnostics.dropped_samples);
        }

        TraceModel {
            config: self.config,
            registry: self.registry,
            threads: self.threads,
            process_cpu: self.process_cpu,
            allocations: self.allocations,
            gc: self.gc,
            time_scale: self.time_scale,
            diagnostics: self.diagnostics,
            raw_lines,
        }
    }

    // Private record handlers

    fn thread_mut(&mut self, id: ThreadId) -> &mut ThreadData {
        let config = &self.config;
        self.threads.entry(id).or_insert_with(|| ThreadData::new(id, config))
    }

    fn handle_stack_sample(&mut self, record: &StackSampleRecord) {
        let timestamp = self.time_scale.to_millis(record.timestamp);
        let time = self.config.sample_time(record.count);
        let config = &self.config;
        let thread = self
            .threads
            .entry(record.thread_id)
            .or_insert_with(|| ThreadData::new(record.thread_id, config));

        match thread.stack.apply_sample(record, timestamp, time, &mut self.registry) {
            Ok(sample) => {
                if sample.is_empty_stack() {
                    self.diagnostics.empty_stack_samples += 1;
                }
                thread.samples.push(sample);
            }
            Err(e) => {
                self.diagnostics.dropped_samples += 1;
                warn!("Dropped stack sample at {timestamp}ms: {e}");
            }
        }
    }

    fn handle_allocation_sample(&mut self, record: &AllocationSampleRecord) {
        let timestamp = self.time_scale.to_millis(record.timestamp);
        let config = &self.config;
        let thread = self
            .threads
            .entry(record.thread_id)
            .or_insert_with(|| ThreadData::new(record.thread_id, config));

        // Allocations belong to whatever was on top of the stack when they happened
        let node = thread.stack.current_top();
        let top_function = thread.stack.top_function();
        let top_line = thread.stack.top_line();
        let stack_lines = thread.stack.lines_snapshot();

        for entry in &record.allocations {
            let line = match (top_function, entry.ip) {
                (Some(function_id), Some(ip)) => self.registry.line_for_ip(function_id, ip),
                _ => None,
            }
            .or(top_line);

            let event = AllocationEvent {
                timestamp,
                class_id: entry.class_id,
                count: entry.count,
                size: entry.size,
                node,
                line,
                stack_lines: stack_lines.clone(),
            };
            if !event.is_attributed() {
                self.diagnostics.unattributed_allocations += 1;
            }
            self.allocations.record(record.thread_id, &event);
            thread.allocations.push(event);
        }
    }
}
