//! Conserved position extraction from written residue tables.
//!
//! A row is conserved when every sequence has a residue (no gap) in that
//! aligned column. For each conserved row the position of a reference
//! sequence is reported, giving the residues of the reference that have a
//! counterpart in every other sequence.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::GAP;
use crate::table::{FILLER, INDEX_HEADER};

/// Reference used when none is given: the second sequence of a pairwise table.
pub const DEFAULT_REFERENCE: usize = 2;

/// Errors that can occur while reading a residue table.
#[derive(Error, Debug)]
pub enum ConservedError {
    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read table {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Not a residue table: first column is '{0}', expected 'Index'")]
    NotATable(String),

    #[error("Reference sequence {reference} is out of range (table has {count} sequences)")]
    ReferenceOutOfRange { reference: usize, count: usize },
}

/// Result type for conservation operations.
pub type ConservedResult<T> = Result<T, ConservedError>;

/// Where one sequence lives in a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceColumns {
    /// `G2` style label
    Combined(usize),
    /// Residue field followed by a position field
    Separate { residue: usize, position: usize },
}

impl SequenceColumns {
    fn is_gap(self, row: &csv::StringRecord) -> bool {
        let residue = match self {
            SequenceColumns::Combined(column) => row.get(column),
            SequenceColumns::Separate { residue, .. } => row.get(residue),
        };
        residue.map_or(true, |field| field.starts_with(GAP))
    }

    fn position(self, row: &csv::StringRecord) -> Option<String> {
        match self {
            SequenceColumns::Combined(column) => {
                let label = row.get(column)?;
                let mut chars = label.chars();
                chars.next()?;
                Some(chars.as_str().to_string())
            }
            SequenceColumns::Separate { position, .. } => row.get(position).map(str::to_string),
        }
    }
}

/// Maps header fields to per-sequence columns, recognising filler columns
/// of the separate layout.
fn sequence_columns(header: &csv::StringRecord) -> ConservedResult<Vec<SequenceColumns>> {
    match header.get(0) {
        Some(INDEX_HEADER) => {}
        other => return Err(ConservedError::NotATable(other.unwrap_or_default().to_string())),
    }

    let mut columns = Vec::new();
    let mut column = 1;
    while column < header.len() {
        if header.get(column + 1) == Some(FILLER) {
            columns.push(SequenceColumns::Separate {
                residue: column,
                position: column + 1,
            });
            column += 2;
        } else {
            columns.push(SequenceColumns::Combined(column));
            column += 1;
        }
    }
    Ok(columns)
}

fn scan<R: io::Read>(
    reader: &mut csv::Reader<R>,
    reference: usize,
) -> ConservedResult<Vec<String>> {
    let columns = sequence_columns(reader.headers()?)?;
    let count = columns.len();
    let reference = reference
        .checked_sub(1)
        .and_then(|i| columns.get(i).copied())
        .ok_or(ConservedError::ReferenceOutOfRange { reference, count })?;

    let mut positions = Vec::new();
    for row in reader.records() {
        let row = row?;
        if columns.iter().any(|column| column.is_gap(&row)) {
            continue;
        }
        if let Some(position) = reference.position(&row) {
            positions.push(position);
        }
    }
    Ok(positions)
}

/// Reads a residue table and returns the reference positions of every
/// gap-free row, in table order.
///
/// `reference` is the 1-based number of the sequence whose positions are
/// reported.
pub fn conserved_positions_from_reader<R: io::Read>(
    reader: R,
    reference: usize,
) -> ConservedResult<Vec<String>> {
    scan(&mut csv::ReaderBuilder::new().from_reader(reader), reference)
}

/// Reads a residue table file and returns the reference positions of every
/// gap-free row.
pub fn conserved_positions<P: AsRef<Path>>(
    path: P,
    reference: usize,
) -> ConservedResult<Vec<String>> {
    let path = path.as_ref();
    let with_path = |source| ConservedError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new().from_path(path).map_err(with_path)?;
    let positions = scan(&mut reader, reference).map_err(|e| match e {
        ConservedError::Csv(source) => with_path(source),
        other => other,
    })?;
    log::info!(
        "{}: {} conserved positions in sequence {}",
        path.display(),
        positions.len(),
        reference
    );
    Ok(positions)
}
