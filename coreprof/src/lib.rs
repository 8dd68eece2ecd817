//! # coreprof - Core Profiler Trace Analyzer
//!
//! coreprof reads the line-oriented trace written by the Core Profiler (a
//! sampling profiler for managed runtimes), rebuilds each thread's call
//! stacks from delta-encoded samples and aggregates samples, time and
//! allocated memory over a selectable time window.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Trace file (text)                          │
//! │   prf / apd / asm / mod / cls / fun / fil / lin / thr / sam ... │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ one record per line
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  parser            TraceReader ──▶ Record (coreprof-common)     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  profiling         EventProcessor                               │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  metadata    │   │   stacks     │   │   history    │         │
//! │  │  (registry)  │◀──│ (call trees) │   │ (cpu, alloc) │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │                            │                                    │
//! │                            ▼                                    │
//! │                       TraceModel                                │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ build_statistics(window)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  provider / analysis                                            │
//! │   Aggregation ──▶ top_methods / top_lines / call tree           │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         ▼
//!                 cli (tables)  ·  export (JSON report)
//! ```
//!
//! ## Module Structure
//!
//! - [`parser`]: Line patterns and the record reader
//! - [`metadata`]: Registry of app domains, assemblies, modules, classes,
//!   functions, source files and interned source lines
//! - [`stacks`]: Arena call tree and delta-stack reconstruction
//! - [`history`]: CPU utilization, allocation and GC time series
//! - [`profiling`]: Record routing, the loaded [`TraceModel`](profiling::TraceModel)
//!   and load diagnostics
//! - [`analysis`]: Windowed aggregation, ranked tables and call-tree views
//! - [`provider`]: [`DataProvider`], the entry point for hosts
//! - [`export`]: JSON report
//! - [`cli`]: Command-line arguments and terminal output
//!
//! ## Typical Usage
//!
//! ```bash
//! # Top methods over the whole trace
//! coreprof app.log
//!
//! # One thread, a 4 second window, with its call tree
//! coreprof app.log --thread 0x1 --start 1000 --end 5000 --tree
//!
//! # JSON report for other tools
//! coreprof app.log --export report.json --quiet
//! ```
//!
//! ## Key Concepts
//!
//! - **Delta stack**: each sample only carries the frames that differ from
//!   the previous sample of the same thread
//! - **Inclusive / exclusive**: weight credited to every frame on the stack,
//!   or only to the top frame
//! - **Unattributed**: weight of samples and allocations with no stack

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod export;
pub mod history;
pub mod metadata;
pub mod parser;
pub mod profiling;
pub mod provider;
pub mod stacks;

pub use config::AnalysisConfig;
pub use provider::{DataProvider, StatisticsSnapshot};
