//! Trace loading
//!
//! Drives one sequential parse pass: reader → parser → event processor. The
//! pass runs on the calling thread; hosts that need to stay responsive run
//! the whole load on a worker (see
//! [`DataProvider::load_in_background`](crate::provider::DataProvider::load_in_background)).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use super::event_processor::EventProcessor;
use super::model::TraceModel;
use crate::config::AnalysisConfig;
use crate::domain::LoadError;
use crate::parser::TraceReader;

/// Load a trace file
///
/// # Errors
/// Returns [`LoadError::Io`] if the file cannot be opened, and
/// [`LoadError::Read`] if reading fails part way through.
pub fn load_trace_file(path: &Path, config: AnalysisConfig) -> Result<TraceModel, LoadError> {
    let file = File::open(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    info!("Loading trace from {}", path.display());
    load_trace(BufReader::new(file), config)
}

/// Load a trace from any buffered reader
///
/// # Errors
/// Returns [`LoadError::Read`] if the underlying reader fails.
pub fn load_trace<R: BufRead>(input: R, config: AnalysisConfig) -> Result<TraceModel, LoadError> {
    let mut raw_lines = config.keep_raw_lines.then(Vec::new);
    let mut processor = EventProcessor::new(config);

    let lines_read = {
        let mut reader = TraceReader::new(input);
        if let Some(raw) = raw_lines.as_mut() {
            reader = reader.with_echo(move |_, line| raw.push(line.to_string()));
        }
        for record in reader.by_ref() {
            processor.process_record(record?);
        }
        reader.line_number()
    };

    processor.diagnostics.lines_read = lines_read;
    Ok(processor.finish(raw_lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_counts_every_line() {
        let input = "thr crt 0x1 0x0\n\ngarbage\nthr dst 0x1\n";
        let model = load_trace(Cursor::new(input), AnalysisConfig::default()).unwrap();
        assert_eq!(model.diagnostics.lines_read, 4);
        assert_eq!(model.diagnostics.records_parsed, 2);
        assert_eq!(model.diagnostics.unrecognized_lines, 1);
        assert!(model.raw_lines.is_none());
    }

    #[test]
    fn test_keeps_raw_lines_when_asked() {
        let config = AnalysisConfig { keep_raw_lines: true, ..AnalysisConfig::default() };
        let model = load_trace(Cursor::new("thr crt 0x1 0x0\ngarbage  \n"), config).unwrap();
        assert_eq!(
            model.raw_lines,
            Some(vec!["thr crt 0x1 0x0".to_string(), "garbage".to_string()])
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_trace_file(Path::new("/nonexistent/trace.log"), AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
