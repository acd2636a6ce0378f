//! Sample-corpus tooling around the textfold filter.
//! Usage:
//!   textfold-bench run [DIR] [--command "brotli --best -c"] [--preset 9]
//!   textfold-bench stats < text
//!   textfold-bench clean-tatoeba sentences.csv out.csv

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use textfold::corpus::{self, BlockStats, DEFAULT_MAX_ASCII_RATIO};
use textfold::harness::{self, CommandCompressor, Compressor, Sha256Hasher, XzCompressor};
use textfold::{Format, Options, TextfoldError};

#[derive(Parser)]
#[command(name = "textfold-bench")]
#[command(version)]
#[command(about = "Verify and measure the textfold filter on sample texts")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Round-trip every *.xz sample and print a compressed-size table
    Run {
        /// Directory searched recursively for *.xz samples
        #[arg(default_value = "testfiles")]
        dir: PathBuf,

        /// External compressor reading stdin and writing stdout
        #[arg(long, conflicts_with = "preset")]
        command: Option<String>,

        /// In-process xz preset (0-9), always in extreme mode
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
        preset: Option<u32>,

        /// Measure the prototype format instead of the word format
        #[arg(long)]
        proto1: bool,
    },
    /// Print the ten busiest Unicode blocks of the UTF-8 text on stdin
    Stats,
    /// Keep Tatoeba sentences that are mostly non-ASCII
    CleanTatoeba {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, default_value_t = DEFAULT_MAX_ASCII_RATIO)]
        max_ascii_ratio: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("textfold=debug,textfold_bench=debug")
        } else {
            EnvFilter::new("textfold=info,textfold_bench=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

fn run(cli: Cli) -> textfold::Result<()> {
    match cli.command {
        Commands::Run {
            dir,
            command,
            preset,
            proto1,
        } => {
            let compressor: Box<dyn Compressor> = match (command, preset) {
                (Some(line), _) => Box::new(CommandCompressor::parse(&line).ok_or_else(|| {
                    TextfoldError::Compressor("empty compressor command".into())
                })?),
                (None, Some(preset)) => Box::new(XzCompressor {
                    preset,
                    extreme: true,
                }),
                (None, None) => Box::new(XzCompressor::default()),
            };
            let format = if proto1 { Format::Proto1 } else { Format::Words };
            let stdout = io::stdout();
            let reports = harness::run_samples(
                &dir,
                &Sha256Hasher,
                compressor.as_ref(),
                Options { format },
                stdout.lock(),
            )?;
            info!("{} samples verified", reports.len());
            Ok(())
        }
        Commands::Stats => {
            let mut raw = Vec::new();
            io::stdin().lock().read_to_end(&mut raw)?;
            let mut stats = BlockStats::new();
            stats.add_text(&String::from_utf8_lossy(&raw));
            stats.write_report(io::stdout().lock())
        }
        Commands::CleanTatoeba {
            input,
            output,
            max_ascii_ratio,
        } => {
            let reader = BufReader::new(File::open(&input)?);
            let writer = BufWriter::new(File::create(&output)?);
            let stats = corpus::clean_tatoeba(reader, writer, max_ascii_ratio)?;
            info!(
                "{}: kept {} sentences, dropped {}",
                output.display(),
                stats.kept,
                stats.dropped
            );
            Ok(())
        }
    }
}
