//! OME-XML object model.
//!
//! Parses OME-XML 2010-04 documents into a cross-linked object graph and
//! writes them back. References between objects (`<ImageRef ID="..."/>`
//! and friends) are collected while parsing and resolved in a separate
//! link pass, so forward references work and every link is recorded in
//! both directions.
//!
//! # Modules
//!
//! - [`model`]: the object model, ID registry, reference queue and linker
//! - [`io`]: read and write whole documents
//! - [`dom`]: the element tree model objects parse from and write to
//! - [`inspect`]: document summaries
//! - [`error`]: error types

pub mod dom;
pub mod error;
pub mod inspect;
pub mod io;
pub mod model;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::OmeError;
pub use io::{
    from_ome_xml_slice, from_ome_xml_str, read_ome_xml, to_ome_xml_string, write_ome_xml,
    ParsedDocument,
};
pub use model::{Model, ParseOptions};

use model::{DuplicateIdPolicy, MismatchPolicy, ParseIssue};

/// The omexml CLI application.
#[derive(Parser)]
#[command(name = "omexml")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log parse and link progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Parse and link a document, reporting problems.
    Check(CheckArgs),
    /// Parse a document and write it back out.
    Roundtrip(RoundtripArgs),
    /// Summarize the objects and references in a document.
    Inspect(InspectArgs),
}

/// Parse settings shared by every subcommand.
#[derive(clap::Args)]
struct ParseArgs {
    /// Fail on unexpected element names instead of warning.
    #[arg(long)]
    strict: bool,

    /// Let a later object take over an ID already in use.
    #[arg(long)]
    allow_duplicate_ids: bool,
}

impl ParseArgs {
    fn options(&self) -> ParseOptions {
        ParseOptions {
            tag_mismatch: if self.strict {
                MismatchPolicy::Error
            } else {
                MismatchPolicy::Warn
            },
            duplicate_ids: if self.allow_duplicate_ids {
                DuplicateIdPolicy::LastWriteWins
            } else {
                DuplicateIdPolicy::Error
            },
        }
    }
}

#[derive(clap::Args)]
struct CheckArgs {
    /// OME-XML file to check.
    input: PathBuf,

    #[command(flatten)]
    parse: ParseArgs,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct RoundtripArgs {
    /// OME-XML file to read.
    input: PathBuf,

    /// Where to write the re-serialized document.
    output: PathBuf,

    #[command(flatten)]
    parse: ParseArgs,
}

#[derive(clap::Args)]
struct InspectArgs {
    /// OME-XML file to inspect.
    input: PathBuf,

    #[command(flatten)]
    parse: ParseArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the omexml CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), OmeError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Roundtrip(args)) => run_roundtrip(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        None => {
            println!("omexml {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("OME-XML object model checker.");
            println!();
            println!("Run 'omexml --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    // A subscriber may already be installed when embedded.
    let _ = subscriber.try_init();
}

/// JSON shape of a `check` result.
#[derive(Serialize)]
struct CheckSummary<'a> {
    input: String,
    objects: usize,
    references: usize,
    warning_count: usize,
    issues: &'a [ParseIssue],
}

fn run_check(args: CheckArgs) -> Result<(), OmeError> {
    let document = read_ome_xml(&args.input, &args.parse.options())?;
    let report = &document.report;

    match args.output.as_str() {
        "json" => {
            let summary = CheckSummary {
                input: args.input.display().to_string(),
                objects: document.model.object_counts().iter().map(|(_, n)| n).sum(),
                references: document.queue.len(),
                warning_count: report.warning_count(),
                issues: &report.issues,
            };
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{json}");
        }
        "text" => print!("{}", report),
        other => {
            return Err(OmeError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    if args.parse.strict && !report.is_clean() {
        return Err(OmeError::CheckFailed {
            warning_count: report.warning_count(),
        });
    }
    Ok(())
}

fn run_roundtrip(args: RoundtripArgs) -> Result<(), OmeError> {
    let document = read_ome_xml(&args.input, &args.parse.options())?;
    write_ome_xml(&args.output, &document.model)?;
    println!(
        "Wrote {} ({} references linked)",
        args.output.display(),
        document.queue.len()
    );
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), OmeError> {
    let document = read_ome_xml(&args.input, &args.parse.options())?;
    let report = inspect::inspect_document(&document, &inspect::InspectOptions::default());

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
        }
        "text" => print!("{}", report),
        other => {
            return Err(OmeError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }
    Ok(())
}
