//! Data model for tabulated alignments.
//!
//! This module contains the per-file data structures:
//! - Sequence records read from aligner output
//! - Indexed residues (residue character plus its position in the sequence)
//!
//! Everything here lives for the processing of a single alignment file.

use std::fmt;

/// Gap symbol used by aligners for a column with no residue.
pub const GAP: char = '-';

/// Represents a single aligned sequence with its name and residues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// The header line as read (without the trailing line break)
    pub raw_name: String,
    /// The cleaned name (ASCII alphanumerics and underscores only)
    pub name: String,
    /// The aligned residues, gaps included
    pub residues: String,
}

impl SequenceRecord {
    /// Creates a new sequence record.
    pub fn new(
        raw_name: impl Into<String>,
        name: impl Into<String>,
        residues: impl Into<String>,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            name: name.into(),
            residues: residues.into(),
        }
    }

    /// Returns the number of aligned columns (residues and gaps).
    pub fn len(&self) -> usize {
        self.residues.chars().count()
    }

    /// Returns true if the record has no residues.
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Number of non-gap residues.
    pub fn residue_count(&self) -> usize {
        self.residues.chars().filter(|&c| c != GAP).count()
    }

    /// Indexes the residues of this record.
    pub fn indexed(&self) -> Vec<IndexedResidue> {
        index_residues(&self.residues)
    }
}

/// A residue character paired with its 1-based position among the
/// non-gap residues of its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedResidue {
    pub residue: char,
    /// `None` for gaps
    pub position: Option<usize>,
}

impl IndexedResidue {
    pub fn is_gap(&self) -> bool {
        self.position.is_none()
    }

    /// Position rendered for a table cell; empty for gaps.
    pub fn position_field(&self) -> String {
        self.position.map(|p| p.to_string()).unwrap_or_default()
    }

    /// Combined label, e.g. `G2`, or `-` for a gap.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IndexedResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{}{}", self.residue, position),
            None => write!(f, "{}", self.residue),
        }
    }
}

/// Assigns running positions to the residues of one sequence.
///
/// The counter starts at 1 and only advances on non-gap characters, so the
/// last position equals the number of residues in the sequence.
pub fn index_residues(residues: &str) -> Vec<IndexedResidue> {
    let mut next_position = 1;
    residues
        .chars()
        .map(|residue| {
            if residue == GAP {
                IndexedResidue {
                    residue,
                    position: None,
                }
            } else {
                let position = next_position;
                next_position += 1;
                IndexedResidue {
                    residue,
                    position: Some(position),
                }
            }
        })
        .collect()
}
