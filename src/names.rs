//! Sequence name cleaning and aligner output renaming.
//!
//! Aligner headers carry database prefixes and punctuation
//! (`>sp|Q15393|SF3B3_HUMAN`). Table columns and file names only keep
//! ASCII alphanumerics and underscores.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::parser::parse_alignment;

/// Extension given to renamed aligner output.
pub const ALIGNMENT_EXTENSION: &str = "txt";

/// Separator used when joining sequence names into a file name.
pub const NAME_SEPARATOR: &str = ",";

/// Removes every character that is not an ASCII letter, digit or underscore.
///
/// Total over arbitrary text: the header marker, whitespace, punctuation and
/// non-ASCII characters all disappear.
pub fn clean_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Joins cleaned names into a file stem, e.g. `P1,P2`.
pub fn joined_stem<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(NAME_SEPARATOR)
}

/// Collects the cleaned names of the sequences in aligner output.
///
/// Names come from the alignment parser, so headers it drops (empty after
/// cleaning, or without residues) are dropped here too and the renamed
/// file matches the table written for it.
pub fn header_names<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let parsed = parse_alignment(reader)?;
    Ok(parsed.records.into_iter().map(|record| record.name).collect())
}

/// Renames an aligner output file after the sequences it contains.
///
/// The new name is the cleaned sequence names joined with `,` plus `.txt`,
/// placed next to the original. Returns `Ok(None)` when the file does not
/// exist, which is how an aligner signals that it produced no alignment,
/// and when it holds no named sequence.
pub fn rename_alignment_output<P: AsRef<Path>>(path: P) -> io::Result<Option<PathBuf>> {
    let path = path.as_ref();
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let names = header_names(BufReader::new(file))?;
    if names.is_empty() {
        log::warn!("{}: no named sequences, not renaming", path.display());
        return Ok(None);
    }

    let file_name = format!("{}.{}", joined_stem(&names), ALIGNMENT_EXTENSION);
    let target = match path.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    };
    fs::rename(path, &target)?;
    log::info!("Renamed {} to {}", path.display(), target.display());
    Ok(Some(target))
}
