//! # coreprof - Main Entry Point
//!
//! Loads a Core Profiler trace, aggregates it over the requested window and
//! prints ranked tables. With `--export` the same snapshot is written as a
//! JSON report.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;

use coreprof::cli::display::{
    display_call_tree, display_cpu, display_diagnostics, display_lines, display_methods,
    display_threads,
};
use coreprof::cli::Args;
use coreprof::domain::Metric;
use coreprof::export::ReportExporter;
use coreprof::DataProvider;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.to_string().to_lowercase().contains("invalid argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    if args.cores == 0 {
        bail!("invalid argument: --cores must be at least 1");
    }
    let window = args.window();

    let provider = DataProvider::load(&args.trace, args.config())
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;
    if !args.quiet {
        display_diagnostics(provider.diagnostics());
    }

    let snapshot = provider.build_statistics(window)?;
    let metric = Metric::from(args.metric);
    info!("Aggregated {window} by {}", metric.label());

    if !args.quiet {
        display_threads(&provider.threads());
        display_methods(&provider.top_methods(args.thread, metric, Some(args.top))?, metric, window);
        display_lines(&provider.top_lines(args.thread, metric, Some(args.top))?, metric);

        if args.tree {
            let threads: Vec<_> = match args.thread {
                Some(id) => vec![id],
                None => snapshot.per_thread.keys().copied().collect(),
            };
            for thread in threads {
                if let Some(tree) = provider.call_tree(thread, metric)? {
                    display_call_tree(thread, &tree, metric);
                }
            }
        }

        if args.cpu {
            display_cpu("application", provider.application_cpu_utilization());
            if let Some(thread) = args.thread {
                let points = provider.thread_cpu_utilization(thread).unwrap_or_default();
                display_cpu(&format!("thread {thread}"), points);
            }
        }
    }

    if let Some(ref path) = args.export {
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        ReportExporter::new(metric)
            .with_limit(args.top)
            .with_call_trees()
            .export(provider.model(), &snapshot, BufWriter::new(file))?;
        if !args.quiet {
            println!("\nexport: {}", path.display());
        }
    }

    Ok(())
}
