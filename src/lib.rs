//! # alntab - Alignment Tabulator
//!
//! Reformats protein alignment output (FASTA or EMBOSS `markx3`) into
//! comma-separated residue tables, one row per aligned column.
//!
//! ## Architecture
//!
//! Each alignment file goes through a fresh pipeline:
//! - `parser`: line classification and per-sequence residue accumulation
//! - `model`: sequence records and residue indexing
//! - `table`: row assembly, alignment length check and CSV output
//! - `names`: header name cleaning and aligner output renaming
//! - `batch`: single file or directory processing with per-file reports
//! - `conserved`: gap-free position extraction from written tables
//!
//! ```no_run
//! use alntab::batch::{process_input, BatchOptions};
//! use alntab::table::TableLayout;
//!
//! let options = BatchOptions::new("tables", TableLayout::Combined);
//! let report = process_input("alignments", &options).unwrap();
//! println!("Wrote {} tables", report.written().len());
//! ```

pub mod batch;
pub mod conserved;
pub mod model;
pub mod names;
pub mod parser;
pub mod table;
