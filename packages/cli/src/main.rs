#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for batch rebate bulletin extraction.
//!
//! Reads a token dump (a JSON array of positioned tokens as produced by
//! the PDF parsing step), runs extraction, and writes the result as CSV or
//! JSON. Not an interactive front-end — one document in, one table out.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use rebate_docs_extract::{dedupe, extract, filter};
use rebate_docs_extract_models::Token;

#[derive(Parser)]
#[command(name = "rebate_docs_cli", about = "Rebate bulletin extraction tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract rebate rows from a token dump
    Extract {
        /// Path to a JSON array of tokens
        tokens: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: Format,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Collapse duplicate rows before writing
        #[arg(long)]
        dedupe: bool,
        /// Document id recorded in the result (defaults to the file stem)
        #[arg(long)]
        doc_id: Option<String>,
        /// Tokenizer name recorded in provenance
        #[arg(long, default_value = "pdfplumber")]
        parser: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract {
            tokens,
            format,
            output,
            dedupe: collapse,
            doc_id,
            parser,
        } => {
            let start = Instant::now();

            let raw = fs::read_to_string(&tokens)?;
            let parsed: Vec<Token> = serde_json::from_str(&raw)?;
            let doc_id = doc_id.unwrap_or_else(|| {
                tokens.file_stem().map_or_else(
                    || "document".to_owned(),
                    |stem| stem.to_string_lossy().into_owned(),
                )
            });

            let mut result = extract(&doc_id, parsed, &parser);
            if collapse {
                result.rows = dedupe::tighten(result.rows);
                let (groups, group_order) = filter::group_by_program(&result.rows);
                result.provenance.groups = groups;
                result.provenance.group_order = group_order;
            }

            let writer: Box<dyn std::io::Write> = match &output {
                Some(path) => Box::new(fs::File::create(path)?),
                None => Box::new(std::io::stdout()),
            };
            match format {
                Format::Csv => rebate_docs_export::write_csv(&result, writer)?,
                Format::Json => rebate_docs_export::write_json(&result, writer)?,
            }

            log::info!(
                "Wrote {} rows for document {doc_id} in {:?}",
                result.rows.len(),
                start.elapsed()
            );
        }
    }

    Ok(())
}
