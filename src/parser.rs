//! Aligner output parser.
//!
//! Reads FASTA-like and `markx3` alignment output line by line and
//! collects one record per named sequence.
//!
//! ## Accepted layout
//!
//! ```text
//! ########################################
//! # Program: stretcher
//! #=======================================
//! >Q15393 ..
//! MFLYNLTLQRATGISHA--IHGNFSG
//! >P55
//! MFLYNLTL-RATGISHAIVIHGNF--
//!
//! #---------------------------------------
//! ```
//!
//! A line containing `>` starts a new sequence. Once a sequence has been
//! seen, a line containing `#` ends the alignment. Everything before the
//! first header is ignored, so markx3 banners never reach a record.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::SequenceRecord;
use crate::names::clean_name;

/// Marks the start of a named sequence.
pub const HEADER_MARKER: char = '>';

/// Marks the end of the final sequence.
pub const TERMINATOR_MARKER: char = '#';

/// Errors that stop a file from being parsed.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Alignment output not found: {}", .0.display())]
    MissingAlignmentOutput(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A sequence boundary that was dropped instead of becoming a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("Header at line {line} has no usable name")]
    EmptyName { line: usize },

    #[error("Sequence '{name}' at line {line} has no residues")]
    EmptyRecord { name: String, line: usize },
}

/// Classification of a single input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Terminator,
    Residues,
}

/// Classifies a line. The terminator only counts once a header was seen.
pub fn classify_line(line: &str, seen_header: bool) -> LineKind {
    if line.contains(HEADER_MARKER) {
        LineKind::Header
    } else if seen_header && line.contains(TERMINATOR_MARKER) {
        LineKind::Terminator
    } else {
        LineKind::Residues
    }
}

/// Records parsed from one alignment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAlignment {
    pub records: Vec<SequenceRecord>,
    /// Boundaries that were skipped, in file order
    pub skipped: Vec<MalformedRecord>,
}

impl ParsedAlignment {
    pub fn sequence_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }
}

#[derive(Debug)]
struct OpenRecord {
    raw_name: String,
    name: String,
    line: usize,
}

/// Residue buffer for the sequence currently being read.
#[derive(Debug, Default)]
struct SequenceAccumulator {
    current: Option<OpenRecord>,
    buffer: String,
    records: Vec<SequenceRecord>,
    skipped: Vec<MalformedRecord>,
}

impl SequenceAccumulator {
    fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Closes the current record and opens a new one for `header`.
    fn open(&mut self, header: &str, line: usize) {
        self.finalize();
        self.current = Some(OpenRecord {
            raw_name: header.to_string(),
            name: clean_name(header),
            line,
        });
    }

    fn push_line(&mut self, line: &str) {
        if self.is_open() {
            self.buffer
                .extend(line.chars().filter(|&c| c != '\n' && c != '\r'));
        }
    }

    /// Moves the buffered residues into a record. No-op without an open record.
    fn finalize(&mut self) {
        let Some(open) = self.current.take() else {
            return;
        };

        let malformed = if open.name.is_empty() {
            Some(MalformedRecord::EmptyName { line: open.line })
        } else if self.buffer.is_empty() {
            Some(MalformedRecord::EmptyRecord {
                name: open.name.clone(),
                line: open.line,
            })
        } else {
            None
        };

        match malformed {
            Some(malformed) => {
                log::warn!("{}. Skipping...", malformed);
                self.buffer.clear();
                self.skipped.push(malformed);
            }
            None => {
                let residues = mem::take(&mut self.buffer);
                self.records
                    .push(SequenceRecord::new(open.raw_name, open.name, residues));
            }
        }
    }

    fn finish(mut self) -> ParsedAlignment {
        self.finalize();
        ParsedAlignment {
            records: self.records,
            skipped: self.skipped,
        }
    }
}

/// Reads one line without its line break. Bytes that are not valid UTF-8
/// become replacement characters, which name cleaning drops.
fn read_line_lossy<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Parses aligner output from a reader.
///
/// Reading stops at the terminator; a file without one ends with its
/// last sequence.
pub fn parse_alignment<R: BufRead>(mut reader: R) -> io::Result<ParsedAlignment> {
    let mut accumulator = SequenceAccumulator::default();
    let mut seen_header = false;
    let mut buf = Vec::new();
    let mut index = 0;

    while let Some(line) = read_line_lossy(&mut reader, &mut buf)? {
        index += 1;
        match classify_line(&line, seen_header) {
            LineKind::Header => {
                accumulator.open(&line, index);
                seen_header = true;
            }
            LineKind::Terminator => break,
            LineKind::Residues => accumulator.push_line(&line),
        }
    }

    Ok(accumulator.finish())
}

/// Parses aligner output from a string.
///
/// Useful for testing or processing in-memory data.
pub fn parse_alignment_str(content: &str) -> ParsedAlignment {
    // Reading from a byte slice cannot fail
    parse_alignment(content.as_bytes()).unwrap_or_default()
}

/// Parses an aligner output file.
///
/// A missing file is reported as [`ParseError::MissingAlignmentOutput`] so
/// callers can treat it as "nothing to process".
pub fn parse_alignment_file<P: AsRef<Path>>(path: P) -> ParseResult<ParsedAlignment> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ParseError::MissingAlignmentOutput(path.to_path_buf())
        } else {
            ParseError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let parsed = parse_alignment(BufReader::new(file)).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "{}: {} sequences, {} skipped boundaries",
        path.display(),
        parsed.sequence_count(),
        parsed.skipped.len()
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_alignment() {
        let parsed = parse_alignment_str(">A\nAC-T\n>B\nA-GT\n#\n");

        assert_eq!(parsed.sequence_count(), 2);
        assert_eq!(parsed.names(), vec!["A", "B"]);
        assert_eq!(parsed.records[0].residues, "AC-T");
        assert_eq!(parsed.records[1].residues, "A-GT");
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_parse_multiline_sequence() {
        let parsed = parse_alignment_str(">seq1\nMKV\nLL-\nQ\n");
        assert_eq!(parsed.records[0].residues, "MKVLL-Q");
    }

    #[test]
    fn test_markx3_banner_is_ignored() {
        let content = "########################################\n\
                       # Program: stretcher\n\
                       # Gaps:          2/26 ( 7.7%)\n\
                       #=======================================\n\
                       >Q15393 ..\n\
                       MFLY--TL\n\
                       >P55 ..\n\
                       MFLYNLTL\n\
                       \n\
                       #---------------------------------------\n\
                       #---------------------------------------\n";
        let parsed = parse_alignment_str(content);

        assert_eq!(parsed.names(), vec!["Q15393", "P55"]);
        assert_eq!(parsed.records[0].raw_name, ">Q15393 ..");
        assert_eq!(parsed.records[0].residues, "MFLY--TL");
        assert_eq!(parsed.records[1].residues, "MFLYNLTL");
    }

    #[test]
    fn test_reading_stops_at_terminator() {
        let parsed = parse_alignment_str(">A\nAC\n#\n>B\nGG\n");
        assert_eq!(parsed.sequence_count(), 1);
        assert_eq!(parsed.records[0].residues, "AC");
    }

    #[test]
    fn test_missing_terminator_keeps_last_sequence() {
        let parsed = parse_alignment_str(">A\nAC\n>B\nGG");
        assert_eq!(parsed.sequence_count(), 2);
        assert_eq!(parsed.records[1].residues, "GG");
    }

    #[test]
    fn test_crlf_line_breaks_are_dropped() {
        let parsed = parse_alignment_str(">A\r\nAC\r\nG-\r\n#\r\n");
        assert_eq!(parsed.records[0].residues, "ACG-");
    }

    #[test]
    fn test_classify_terminator_needs_header() {
        assert_eq!(classify_line("# banner", false), LineKind::Residues);
        assert_eq!(classify_line("# banner", true), LineKind::Terminator);
        assert_eq!(classify_line(">P1", false), LineKind::Header);
        assert_eq!(classify_line("MKV", true), LineKind::Residues);
    }

    #[test]
    fn test_empty_name_is_skipped() {
        let parsed = parse_alignment_str(">A\nAC\n>--\nGG\n>B\nTT\n");

        assert_eq!(parsed.names(), vec!["A", "B"]);
        assert_eq!(parsed.skipped, vec![MalformedRecord::EmptyName { line: 3 }]);
    }

    #[test]
    fn test_header_without_residues_is_skipped() {
        let parsed = parse_alignment_str(">A\n>B\nTT\n#\n");

        assert_eq!(parsed.names(), vec!["B"]);
        assert_eq!(
            parsed.skipped,
            vec![MalformedRecord::EmptyRecord {
                name: "A".to_string(),
                line: 1
            }]
        );
    }

    #[test]
    fn test_no_header_yields_no_records() {
        let parsed = parse_alignment_str("# only a banner\nACGT\n");
        assert!(parsed.is_empty());
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_fresh_state_per_parse() {
        let first = parse_alignment_str(">A\nAC\n#\n");
        let second = parse_alignment_str(">B\nGG\n#\n");
        assert_eq!(first.records[0].residues, "AC");
        assert_eq!(second.sequence_count(), 1);
        assert_eq!(second.records[0].residues, "GG");
    }

    #[test]
    fn test_invalid_utf8_is_kept() {
        let content: &[u8] = b">Prot\xe9ine\nAC\n>B\nAG\n#\n";
        let parsed = parse_alignment(content).unwrap();

        assert_eq!(parsed.names(), vec!["Protine", "B"]);
        assert_eq!(parsed.records[0].residues, "AC");
        assert_eq!(parsed.records[1].residues, "AG");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_alignment_file(dir.path().join("absent.txt"));
        assert!(matches!(result, Err(ParseError::MissingAlignmentOutput(_))));
    }
}
