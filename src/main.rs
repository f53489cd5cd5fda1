//! CLI entry point for the ThreatSpec extractor.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use threatspec_parser::{aggregator, output, Error, Grammar, Result};

#[derive(Parser)]
#[command(name = "threatspec")]
#[command(author, version, about = "Extract ThreatSpec annotations from source comments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one CSV row per function declaration
    Csv {
        /// Source files (or directories) to process, in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Emit a JSON array of records
    Json {
        /// Source files (or directories) to process, in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Print a human-readable summary of the extracted records
    Report {
        /// Source files (or directories) to process, in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let grammar = Grammar::new()?;

    match command {
        Commands::Csv { paths, output: dest } => {
            // Create the destination before processing so a bad path fails
            // up front; write only after every input aggregated cleanly.
            let mut writer = open_output(dest.as_deref())?;
            let records = aggregator::aggregate(&grammar, &paths)?;
            writer.write_all(output::to_csv(&records).as_bytes())?;
            writer.flush()?;
        }

        Commands::Json {
            paths,
            output: dest,
            pretty,
        } => {
            let mut writer = open_output(dest.as_deref())?;
            let records = aggregator::aggregate(&grammar, &paths)?;
            writer.write_all(output::to_json(&records, pretty)?.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        Commands::Report { paths } => {
            let records = aggregator::aggregate(&grammar, &paths)?;
            print!("{}", output::format_report(&records));
        }
    }

    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| Error::OutputCreate {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout())),
    }
}
