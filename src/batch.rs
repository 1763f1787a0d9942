//! Per-file processing and directory batches.
//!
//! Each input file is parsed, tabulated and written on its own: parser
//! state is created for the file and dropped with it, so residues never
//! leak from one alignment into the next. A failure in one file is
//! recorded in the [`BatchReport`] and the batch moves on.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parser::{parse_alignment_file, ParseError};
use crate::table::{AlignmentTable, TableError, TableLayout};

/// Errors that fail a single file (or the batch setup).
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to list directory {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// True when aligned sequences disagree on the alignment length.
    pub fn is_row_length_mismatch(&self) -> bool {
        matches!(self, ProcessError::Table(TableError::RowLengthMismatch { .. }))
    }
}

/// Result type for processing operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Where and how tables are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub layout: TableLayout,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>, layout: TableLayout) -> Self {
        Self {
            output_dir: output_dir.into(),
            layout,
        }
    }
}

/// Why a file produced no table without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The aligner did not produce this file
    MissingAlignmentOutput,
    /// The file holds no named sequence
    EmptyAlignment,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingAlignmentOutput => write!(f, "no alignment output"),
            SkipReason::EmptyAlignment => write!(f, "no sequences found"),
        }
    }
}

/// Successful result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written {
        table: PathBuf,
        sequences: usize,
        rows: usize,
    },
    Skipped(SkipReason),
}

/// Outcome of one input file within a batch.
#[derive(Debug)]
pub struct FileReport {
    pub input: PathBuf,
    pub result: ProcessResult<FileOutcome>,
}

/// Outcomes of every file in a batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    /// Paths of the tables that were written.
    pub fn written(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter_map(|report| match &report.result {
                Ok(FileOutcome::Written { table, .. }) => Some(table.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Inputs that were skipped, with the reason.
    pub fn skipped(&self) -> Vec<(&Path, SkipReason)> {
        self.files
            .iter()
            .filter_map(|report| match &report.result {
                Ok(FileOutcome::Skipped(reason)) => Some((report.input.as_path(), *reason)),
                _ => None,
            })
            .collect()
    }

    /// Inputs that failed, with the error.
    pub fn failed(&self) -> Vec<(&Path, &ProcessError)> {
        self.files
            .iter()
            .filter_map(|report| match &report.result {
                Err(e) => Some((report.input.as_path(), e)),
                _ => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|report| report.result.is_err())
    }
}

/// Turns one aligner output file into a table under `options.output_dir`.
///
/// A missing input or an input without sequences is skipped; unequal
/// sequence lengths and I/O problems fail the file.
pub fn process_file<P: AsRef<Path>>(input: P, options: &BatchOptions) -> ProcessResult<FileOutcome> {
    let parsed = match parse_alignment_file(input.as_ref()) {
        Ok(parsed) => parsed,
        Err(ParseError::MissingAlignmentOutput(_)) => {
            return Ok(FileOutcome::Skipped(SkipReason::MissingAlignmentOutput));
        }
        Err(e) => return Err(e.into()),
    };

    let table = AlignmentTable::from_records(&parsed.records, options.layout)?;
    if table.is_empty() {
        return Ok(FileOutcome::Skipped(SkipReason::EmptyAlignment));
    }

    let path = table.write_to_dir(&options.output_dir)?;
    Ok(FileOutcome::Written {
        table: path,
        sequences: table.sequence_count(),
        rows: table.alignment_length(),
    })
}

/// Lists the files to process: the input itself, or the regular files of
/// a directory sorted by name.
pub fn input_files<P: AsRef<Path>>(input: P) -> ProcessResult<Vec<PathBuf>> {
    let input = input.as_ref();
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let list_error = |source| ProcessError::ListDir {
        path: input.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(input).map_err(list_error)? {
        let path = entry.map_err(list_error)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Processes every file in `files`, logging each outcome.
pub fn process_files(files: &[PathBuf], options: &BatchOptions) -> BatchReport {
    let mut report = BatchReport::default();
    let mut tables = HashSet::new();

    for input in files {
        let result = process_file(input, options);
        match &result {
            Ok(FileOutcome::Written { table, sequences, rows }) => {
                log::info!(
                    "{}: wrote {} ({} sequences, {} rows)",
                    input.display(),
                    table.display(),
                    sequences,
                    rows
                );
                if !tables.insert(table.clone()) {
                    log::warn!("{} was overwritten by {}", table.display(), input.display());
                }
            }
            Ok(FileOutcome::Skipped(reason)) => {
                log::warn!("{}: {}. Skipping...", input.display(), reason);
            }
            Err(e) if e.is_row_length_mismatch() => {
                log::error!("{}: not a valid alignment: {}", input.display(), e);
            }
            Err(e) => log::error!("{}: {}", input.display(), e),
        }
        report.files.push(FileReport {
            input: input.clone(),
            result,
        });
    }

    report
}

/// Processes a single file or every file of a directory.
pub fn process_input<P: AsRef<Path>>(input: P, options: &BatchOptions) -> ProcessResult<BatchReport> {
    fs::create_dir_all(&options.output_dir).map_err(|source| ProcessError::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;
    let files = input_files(input)?;
    log::debug!("{} input files, {} layout", files.len(), options.layout);
    Ok(process_files(&files, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_process_file_writes_table() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = write(input.path(), "pair.txt", ">A\nAC-T\n>B\nA-GT\n#\n");
        let options = BatchOptions::new(output.path(), TableLayout::Combined);

        let outcome = process_file(&file, &options).unwrap();
        let table = output.path().join("A,B.csv");
        assert_eq!(
            outcome,
            FileOutcome::Written {
                table: table.clone(),
                sequences: 2,
                rows: 4
            }
        );
        let content = fs::read_to_string(table).unwrap();
        assert_eq!(content.lines().nth(3), Some("3,-,G2"));
    }

    #[test]
    fn test_missing_input_is_skipped() {
        let output = tempfile::tempdir().unwrap();
        let options = BatchOptions::new(output.path(), TableLayout::Combined);

        let outcome = process_file(output.path().join("renameFile.txt"), &options).unwrap();
        assert_eq!(outcome, FileOutcome::Skipped(SkipReason::MissingAlignmentOutput));
    }

    #[test]
    fn test_empty_alignment_is_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = write(input.path(), "banner.txt", "# nothing aligned\n");
        let options = BatchOptions::new(output.path(), TableLayout::Combined);

        let outcome = process_file(&file, &options).unwrap();
        assert_eq!(outcome, FileOutcome::Skipped(SkipReason::EmptyAlignment));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_row_length_mismatch_fails_file() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = write(input.path(), "bad.txt", ">A\nACGT\n>B\nAC\n#\n");
        let options = BatchOptions::new(output.path(), TableLayout::Combined);

        let err = process_file(&file, &options).unwrap_err();
        assert!(err.is_row_length_mismatch());
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "a.txt", ">P1\nMK-V\n>P2\nM-LV\n#\n");
        write(input.path(), "b.txt", ">Q1\nAC\n>Q2\nA-\n>Q3\n-C\n#\n");
        write(input.path(), "c.txt", ">R1\nACGT\n>R2\nA\n#\n");
        fs::create_dir(input.path().join("nested")).unwrap();
        let options = BatchOptions::new(output.path(), TableLayout::Combined);

        let report = process_input(input.path(), &options).unwrap();

        assert_eq!(report.files.len(), 3);
        assert_eq!(
            report.written(),
            vec![
                output.path().join("P1,P2.csv").as_path(),
                output.path().join("Q1,Q2,Q3.csv").as_path()
            ]
        );
        assert!(report.has_failures());
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].0, input.path().join("c.txt"));

        // Each table only holds its own alignment
        let first = fs::read_to_string(output.path().join("P1,P2.csv")).unwrap();
        let second = fs::read_to_string(output.path().join("Q1,Q2,Q3.csv")).unwrap();
        assert_eq!(first.lines().count(), 1 + 4);
        assert_eq!(second, "Index,Q1,Q2,Q3\n1,A1,A1,-\n2,C2,-,C1\n");
    }

    #[test]
    fn test_valid_and_missing_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let files = vec![
            write(input.path(), "one.txt", ">A\nMK\n>B\nMK\n#\n"),
            input.path().join("absent1.txt"),
            write(input.path(), "two.txt", ">C\nW\n>D\nW\n#\n"),
            input.path().join("absent2.txt"),
        ];
        let options = BatchOptions::new(output.path(), TableLayout::Separate);

        let report = process_files(&files, &options);

        assert_eq!(report.written().len(), 2);
        assert_eq!(report.skipped().len(), 2);
        assert!(report
            .skipped()
            .iter()
            .all(|(_, reason)| *reason == SkipReason::MissingAlignmentOutput));
        assert!(!report.has_failures());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = write(input.path(), "pair.txt", ">A\nAC-T\n>B\nA-GT\n#\n");
        let options = BatchOptions::new(output.path(), TableLayout::Separate);

        process_file(&file, &options).unwrap();
        let first = fs::read(output.path().join("A,B.csv")).unwrap();
        process_file(&file, &options).unwrap();
        let second = fs::read(output.path().join("A,B.csv")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_single_file_input() {
        let input = tempfile::tempdir().unwrap();
        let file = write(input.path(), "pair.txt", ">A\nA\n");
        assert_eq!(input_files(&file).unwrap(), vec![file]);
    }
}
