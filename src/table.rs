//! Residue table assembly and CSV output.
//!
//! The table has one row per aligned column and one field group per
//! sequence:
//!
//! ```text
//! Index,A,B
//! 1,A1,A1
//! 2,C2,-
//! 3,-,G2
//! 4,T3,T3
//! ```
//!
//! In the separate layout every sequence contributes a residue field and a
//! position field, and the header pads each name with a filler column.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{IndexedResidue, SequenceRecord};
use crate::names::joined_stem;

/// Header of the leading row-number column.
pub const INDEX_HEADER: &str = "Index";

/// Header placeholder for position columns in the separate layout.
pub const FILLER: &str = "..........";

/// Extension of written tables.
pub const TABLE_EXTENSION: &str = "csv";

/// How residues are laid out in the table body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableLayout {
    /// One `G2` style field per sequence
    #[default]
    Combined,
    /// Residue and position in two fields per sequence
    Separate,
}

impl TableLayout {
    /// Number of table fields each sequence occupies.
    pub fn fields_per_sequence(self) -> usize {
        match self {
            TableLayout::Combined => 1,
            TableLayout::Separate => 2,
        }
    }
}

impl std::fmt::Display for TableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableLayout::Combined => write!(f, "combined"),
            TableLayout::Separate => write!(f, "separate"),
        }
    }
}

/// Errors that can occur while building or writing a table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Sequence '{name}' spans {found} aligned columns, expected {expected}")]
    RowLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Failed to write table {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Indexed residues of one alignment, ready to be written row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentTable {
    column_names: Vec<String>,
    /// One indexed residue list per sequence, all of equal length
    columns: Vec<Vec<IndexedResidue>>,
    layout: TableLayout,
    alignment_length: usize,
}

impl AlignmentTable {
    /// Indexes every record and checks that they cover the same number of
    /// aligned columns.
    pub fn from_records(records: &[SequenceRecord], layout: TableLayout) -> TableResult<Self> {
        let columns: Vec<Vec<IndexedResidue>> =
            records.iter().map(SequenceRecord::indexed).collect();
        let alignment_length = columns.first().map_or(0, Vec::len);

        if let Some((record, column)) = records
            .iter()
            .zip(&columns)
            .find(|(_, column)| column.len() != alignment_length)
        {
            return Err(TableError::RowLengthMismatch {
                name: record.name.clone(),
                expected: alignment_length,
                found: column.len(),
            });
        }

        Ok(Self {
            column_names: records.iter().map(|r| r.name.clone()).collect(),
            columns,
            layout,
            alignment_length,
        })
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the number of sequences.
    pub fn sequence_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the number of body rows.
    pub fn alignment_length(&self) -> usize {
        self.alignment_length
    }

    /// True when the alignment had no sequences.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The residues of aligned column `row` (0-based), one per sequence.
    pub fn row(&self, row: usize) -> Option<Vec<IndexedResidue>> {
        if row >= self.alignment_length {
            return None;
        }
        Some(self.columns.iter().map(|column| column[row]).collect())
    }

    /// Header fields: `Index` followed by the sequence names.
    pub fn header(&self) -> Vec<String> {
        let width = 1 + self.sequence_count() * self.layout.fields_per_sequence();
        let mut header = Vec::with_capacity(width);
        header.push(INDEX_HEADER.to_string());
        for name in &self.column_names {
            header.push(name.clone());
            if self.layout == TableLayout::Separate {
                header.push(FILLER.to_string());
            }
        }
        header
    }

    /// Fields of body row `row` (0-based), starting with its 1-based number.
    pub fn row_fields(&self, row: usize) -> Option<Vec<String>> {
        let residues = self.row(row)?;
        let mut fields = Vec::with_capacity(1 + residues.len() * self.layout.fields_per_sequence());
        fields.push((row + 1).to_string());
        for residue in residues {
            match self.layout {
                TableLayout::Combined => fields.push(residue.label()),
                TableLayout::Separate => {
                    fields.push(residue.residue.to_string());
                    fields.push(residue.position_field());
                }
            }
        }
        Some(fields)
    }

    /// File name of the table: cleaned names joined with `,` plus `.csv`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", joined_stem(&self.column_names), TABLE_EXTENSION)
    }

    /// Writes the header and every body row as CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv_writer().from_writer(writer);
        self.write_records(&mut writer)
    }

    /// Writes the table into `dir`, replacing any previous table of the same
    /// sequences, and returns its path.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> TableResult<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        csv_writer()
            .from_path(&path)
            .and_then(|mut writer| self.write_records(&mut writer))
            .map_err(|source| TableError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    fn write_records<W: io::Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        writer.write_record(self.header())?;
        for row in 0..self.alignment_length {
            if let Some(fields) = self.row_fields(row) {
                writer.write_record(&fields)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_writer() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.terminator(csv::Terminator::Any(b'\n'));
    builder
}
