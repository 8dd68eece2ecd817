//! Streaming trace reader
//!
//! Reads a trace line by line and yields one [`Record`] per line, strictly in
//! stream order. Stack reconstruction depends on that order, so there is no
//! buffering or reordering here.

use std::io::{self, BufRead};

use coreprof_common::Record;

use super::record_parser::parse_line;

/// Callback invoked with every raw line, matched or not
pub type LineEcho<'a> = Box<dyn FnMut(usize, &str) + 'a>;

/// Iterator over the records of a trace stream
pub struct TraceReader<'a, R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    echo: Option<LineEcho<'a>>,
}

impl<'a, R: BufRead> TraceReader<'a, R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buffer: Vec::with_capacity(256), line_number: 0, echo: None }
    }

    /// Install a raw-line echo, fired before each line is parsed
    #[must_use]
    pub fn with_echo(mut self, echo: impl FnMut(usize, &str) + 'a) -> Self {
        self.echo = Some(Box::new(echo));
        self
    }

    /// 1-based number of the last line read
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        // Invalid UTF-8 cannot match any pattern; keep it visible as text
        Ok(Some(String::from_utf8_lossy(&self.buffer).into_owned()))
    }
}

impl<R: BufRead> Iterator for TraceReader<'_, R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            if let Some(echo) = self.echo.as_mut() {
                echo(self.line_number, line.trim_end_matches(['\r', '\n']));
            }
            // Blank lines are separators, not records
            if line.trim().is_empty() {
                continue;
            }
            return Some(Ok(parse_line(&line)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coreprof_common::ThreadId;
    use std::io::Cursor;

    #[test]
    fn test_reader_yields_records_in_order() {
        let input = "thr crt 0x1 0x0\n\nthr dst 0x1\n";
        let records: Vec<Record> =
            TraceReader::new(Cursor::new(input)).collect::<io::Result<_>>().unwrap();

        assert_eq!(
            records,
            vec![
                Record::ThreadCreated { id: ThreadId(1), runtime_id: 0 },
                Record::ThreadDestroyed { id: ThreadId(1) },
            ]
        );
    }

    #[test]
    fn test_echo_sees_every_line() {
        let input = "thr crt 0x1 0x0\ngarbage data here\n\nthr dst 0x1";
        let mut echoed = Vec::new();
        let count = TraceReader::new(Cursor::new(input))
            .with_echo(|number, line| echoed.push((number, line.to_string())))
            .count();

        assert_eq!(count, 3);
        assert_eq!(echoed.len(), 4);
        assert_eq!(echoed[1], (2, "garbage data here".to_string()));
        assert_eq!(echoed[3], (4, "thr dst 0x1".to_string()));
    }

    #[test]
    fn test_echo_keeps_trailing_whitespace() {
        let input = "thr dst 0x1  \t\r\ngarbage \n";
        let mut echoed = Vec::new();
        let records: Vec<Record> = TraceReader::new(Cursor::new(input))
            .with_echo(|_, line| echoed.push(line.to_string()))
            .collect::<io::Result<_>>()
            .unwrap();

        assert_eq!(echoed, vec!["thr dst 0x1  \t".to_string(), "garbage ".to_string()]);
        assert_eq!(records[0], Record::ThreadDestroyed { id: ThreadId(1) });
        assert_eq!(records[1], Record::Unrecognized("garbage".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_unrecognized() {
        let input: &[u8] = b"\xff\xfe bad\nthr dst 0x2\n";
        let records: Vec<Record> =
            TraceReader::new(input).collect::<io::Result<_>>().unwrap();

        assert!(records[0].is_unrecognized());
        assert_eq!(records[1], Record::ThreadDestroyed { id: ThreadId(2) });
    }
}
