// Module declarations
mod cli;
mod util;
mod config;
mod session;
mod docx;
mod repaginate;
mod convert;
mod run_log;
mod bridges;

// Re-export all module items at crate root so cross-module references work.
#[allow(unused_imports)]
pub(crate) use cli::*;
#[allow(unused_imports)]
pub(crate) use util::*;
#[allow(unused_imports)]
pub(crate) use config::*;
#[allow(unused_imports)]
pub(crate) use session::*;
#[allow(unused_imports)]
pub(crate) use docx::*;
#[allow(unused_imports)]
pub(crate) use repaginate::*;
#[allow(unused_imports)]
pub(crate) use convert::*;
#[allow(unused_imports)]
pub(crate) use run_log::*;
#[allow(unused_imports)]
pub(crate) use bridges::*;

// External crate imports used directly in main()
use std::fs;

use clap::Parser;
use serde::Serialize;

#[derive(Serialize)]
struct SplitInputSummary {
    file: String,
    tables: usize,
}

#[derive(Serialize)]
struct SplitSummary {
    total_tables: usize,
    inputs: Vec<SplitInputSummary>,
    outputs: Vec<String>,
}

#[derive(Serialize)]
struct TableSummary {
    index: usize,
    rows: usize,
    columns: usize,
    spanned_cells: usize,
    style: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Bridge {
            token,
            work_dir,
            tables_per_file,
            poll_timeout,
            poll_limit,
        } => run_bridge(token, work_dir, tables_per_file, poll_timeout, poll_limit),

        Command::Split {
            inputs,
            out_dir,
            tables_per_file,
            json,
        } => {
            if inputs.is_empty() {
                eprintln!("No input files given");
                std::process::exit(2);
            }
            fs::create_dir_all(&out_dir)?;
            let outcome = convert_files(&inputs, &out_dir, tables_per_file, "")?;

            if json {
                let summary = SplitSummary {
                    total_tables: outcome.total_tables,
                    inputs: outcome
                        .per_file
                        .iter()
                        .map(|(file, tables)| SplitInputSummary {
                            file: file.clone(),
                            tables: *tables,
                        })
                        .collect(),
                    outputs: outcome
                        .outputs
                        .iter()
                        .map(|o| o.path.display().to_string())
                        .collect(),
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            for (file, tables) in &outcome.per_file {
                println!("{file}: {tables} table(s)");
            }
            if outcome.outputs.is_empty() {
                println!("No tables found; nothing written.");
            } else {
                println!(
                    "Found {} table(s); wrote {} document(s)",
                    outcome.total_tables,
                    outcome.outputs.len()
                );
                for output in &outcome.outputs {
                    println!("  {}", output.path.display());
                }
            }
            Ok(())
        }

        Command::Inspect { input, json } => {
            let tables = read_tables_from_path(&input)?;

            if json {
                let summaries: Vec<TableSummary> = tables
                    .iter()
                    .enumerate()
                    .map(|(i, table)| TableSummary {
                        index: i + 1,
                        rows: table.row_count(),
                        columns: table.columns,
                        spanned_cells: table.spanned_cell_count(),
                        style: table.style.clone(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }

            if tables.is_empty() {
                println!("No tables found.");
                return Ok(());
            }
            for (i, table) in tables.iter().enumerate() {
                let style = table.style.as_deref().unwrap_or("-");
                println!(
                    "table {}: {} row(s) x {} col(s), {} spanned cell(s), style {}",
                    i + 1,
                    table.row_count(),
                    table.columns,
                    table.spanned_cell_count(),
                    style
                );
            }
            Ok(())
        }
    }
}
