use coreprof::domain::{LoadError, Metric, ThreadId, TimeFrame};
use coreprof::export::ReportExporter;
use coreprof::{AnalysisConfig, DataProvider};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const TRACE: &str = include_str!("fixtures/simple_trace.log");

fn trace_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write trace");
    file.flush().expect("Failed to flush trace");
    file
}

#[test]
fn test_load_from_file() {
    let file = trace_file(TRACE);
    let provider = DataProvider::load(file.path(), AnalysisConfig::default()).unwrap();
    assert_eq!(provider.threads().len(), 2);
    assert_eq!(provider.diagnostics().unrecognized_lines, 1);
}

#[test]
fn test_missing_file_is_an_io_error() {
    let path = PathBuf::from("/nonexistent/coreprof/trace.log");
    let err = DataProvider::load(&path, AnalysisConfig::default()).err().unwrap();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/coreprof/trace.log"));
}

#[test]
fn test_background_load_delivers_one_result() {
    let file = trace_file(TRACE);
    let rx = DataProvider::load_in_background(file.path().to_path_buf(), AnalysisConfig::default());
    let provider = DataProvider::wait_for(&rx).unwrap();
    assert_eq!(provider.model().sample_count(), 5);

    // The worker is gone after its single send
    assert!(matches!(DataProvider::wait_for(&rx), Err(LoadError::LoaderDisconnected)));
}

#[test]
fn test_background_load_reports_errors() {
    let rx = DataProvider::load_in_background(
        PathBuf::from("/nonexistent/coreprof/trace.log"),
        AnalysisConfig::default(),
    );
    assert!(matches!(DataProvider::wait_for(&rx), Err(LoadError::Io { .. })));
}

#[test]
fn test_cpu_utilization_series() {
    let provider = DataProvider::load_from_reader(TRACE.as_bytes(), AnalysisConfig::default()).unwrap();

    let process = provider.application_cpu_utilization();
    assert_eq!(process.len(), 1);
    assert_eq!(process[0].timestamp, 1000);
    assert!((process[0].utilization - 50.0).abs() < 1e-9);

    let thread = provider.thread_cpu_utilization(ThreadId(1)).unwrap();
    assert!((thread[0].utilization - 25.0).abs() < 1e-9);
    assert!(provider.thread_cpu_utilization(ThreadId(2)).unwrap().is_empty());
    assert!(provider.thread_cpu_utilization(ThreadId(9)).is_none());
}

#[test]
fn test_cpu_utilization_normalized_by_cores_and_clamped() {
    let config = AnalysisConfig { core_count: 2, ..AnalysisConfig::default() };
    let provider = DataProvider::load_from_reader(TRACE.as_bytes(), config).unwrap();
    assert!((provider.application_cpu_utilization()[0].utilization - 25.0).abs() < 1e-9);

    // 3 s of CPU in 1 s of wall time on one core
    let busy = "prc cpu 0 0\nprc cpu 1000 3000000\n";
    let provider = DataProvider::load_from_reader(busy.as_bytes(), AnalysisConfig::default()).unwrap();
    assert!((provider.application_cpu_utilization()[0].utilization - 100.0).abs() < 1e-9);
}

#[test]
fn test_raw_lines_kept_on_request() {
    let config = AnalysisConfig { keep_raw_lines: true, ..AnalysisConfig::default() };
    let provider = DataProvider::load_from_reader(TRACE.as_bytes(), config).unwrap();
    let raw = provider.model().raw_lines.as_ref().unwrap();
    assert_eq!(raw.len(), 30);
    assert_eq!(raw[28], "garbage data here");

    let provider = DataProvider::load_from_reader(TRACE.as_bytes(), AnalysisConfig::default()).unwrap();
    assert!(provider.model().raw_lines.is_none());
}

#[test]
fn test_export_report_json() {
    let provider = DataProvider::load_from_reader(TRACE.as_bytes(), AnalysisConfig::default()).unwrap();
    let snapshot = provider.build_statistics(TimeFrame::unbounded()).unwrap();

    let mut buffer = Vec::new();
    ReportExporter::new(Metric::SamplesInclusive)
        .with_limit(2)
        .with_call_trees()
        .export(provider.model(), &snapshot, &mut buffer)
        .expect("Failed to export report");

    let parsed: serde_json::Value = serde_json::from_slice(&buffer).expect("Invalid JSON");
    assert_eq!(parsed["methods"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["methods"][0]["name"], "App.Program.Main");
    assert_eq!(parsed["totals"]["samples_inclusive"], 5);
    assert_eq!(parsed["threads"].as_array().unwrap().len(), 2);
    assert!(parsed["threads"][0]["call_tree"].is_object());
}
