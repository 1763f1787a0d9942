//! alntab - Alignment Tabulator
//!
//! Turns protein alignment output into spreadsheet-readable residue tables.
//!
//! ## Usage
//!
//! ```bash
//! alntab tabulate alignment.txt -o tables/
//! alntab tabulate alignments/ -o tables/ -l separate
//! alntab conserved tables/Q15393,P55.csv
//! alntab rename renameFile.txt
//! ```
//!
//! ## Supported Inputs
//!
//! - FASTA alignments (`>` headers)
//! - markx3 output of EMBOSS aligners (stretcher, emma)

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};

use alntab::batch::{process_input, BatchOptions};
use alntab::conserved::{conserved_positions, DEFAULT_REFERENCE};
use alntab::names::rename_alignment_output;
use alntab::table::TableLayout;

/// Table layout for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// One `G2` style field per sequence
    Combined,
    /// Residue and position in separate columns
    Separate,
}

impl From<LayoutArg> for TableLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Combined => TableLayout::Combined,
            LayoutArg::Separate => TableLayout::Separate,
        }
    }
}

/// alntab - Reformat protein alignment output into residue tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbosity: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one CSV table per alignment file
    Tabulate {
        /// Alignment file, or directory of alignment files
        input: PathBuf,

        /// Directory receiving the tables (created if missing)
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output_dir: PathBuf,

        /// Place residue type and number in one column or two
        #[arg(short = 'l', long = "layout", value_enum, default_value = "combined")]
        layout: LayoutArg,
    },

    /// Print positions of the reference sequence at gap-free columns of a table
    Conserved {
        /// Table written by `tabulate`
        table: PathBuf,

        /// 1-based number of the reference sequence
        #[arg(short = 'r', long = "reference", default_value_t = DEFAULT_REFERENCE)]
        reference: usize,
    },

    /// Rename aligner output after the sequences it contains
    Rename {
        /// Aligner output files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_verbose(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match level {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

/// Runs `tabulate`: fails the process when any file failed.
fn run_tabulate(input: &PathBuf, output_dir: PathBuf, layout: TableLayout) -> Result<()> {
    let options = BatchOptions::new(output_dir, layout);
    let report = process_input(input, &options)?;

    let failed = report.failed();
    eprintln!(
        "Wrote {} tables, skipped {} files, {} failed",
        report.written().len(),
        report.skipped().len(),
        failed.len()
    );
    if !failed.is_empty() {
        anyhow::bail!("{} of {} files could not be tabulated", failed.len(), report.files.len());
    }
    Ok(())
}

fn run_conserved(table: &PathBuf, reference: usize) -> Result<()> {
    let positions = conserved_positions(table, reference)?;
    println!("{}", positions.join(","));
    Ok(())
}

fn run_rename(files: &[PathBuf]) -> Result<()> {
    for file in files {
        match rename_alignment_output(file)
            .with_context(|| format!("Failed to rename {}", file.display()))?
        {
            Some(target) => println!("{}", target.display()),
            None => log::warn!("{}: nothing to rename. Skipping...", file.display()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(cli.verbosity);
    log::info!("Running {}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Tabulate {
            input,
            output_dir,
            layout,
        } => run_tabulate(&input, output_dir, layout.into())?,
        Command::Conserved { table, reference } => run_conserved(&table, reference)?,
        Command::Rename { files } => run_rename(&files)?,
    }

    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}
