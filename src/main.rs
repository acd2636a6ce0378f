//! textfold CLI
//! Usage:
//!   textfold [--proto1] [-v] < input > encoded
//!   textfold -d [-v]         < encoded > input

use std::io::{self, BufReader, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use textfold::{Format, Options};

#[derive(Parser)]
#[command(name = "textfold")]
#[command(version)]
#[command(about = "Preprocessing filter for improving LZMA compression of non-English UTF-8 texts. \
Reads data from stdin and writes results to stdout.")]
struct Cli {
    /// Decode instead of encode
    #[arg(short, long)]
    decode: bool,

    /// Encode in the prototype format (no word references)
    #[arg(long, conflicts_with = "decode")]
    proto1: bool,

    /// Log codepage detection and unit statistics to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
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
            EnvFilter::new("textfold=debug")
        } else {
            EnvFilter::new("textfold=info")
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

fn run(cli: &Cli) -> textfold::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let input = BufReader::new(stdin.lock());
    let output = BufWriter::new(stdout.lock());

    if cli.decode {
        let stats = textfold::decode_stream(input, output)?;
        debug!(
            "Decoded {} bytes -> {} bytes ({:?})",
            stats.input_bytes, stats.output_bytes, stats.format
        );
    } else {
        let format = if cli.proto1 { Format::Proto1 } else { Format::Words };
        let stats = textfold::encode_stream(input, output, Options { format })?;
        debug!(
            "Encoded {} bytes -> {} bytes",
            stats.input_bytes, stats.output_bytes
        );
    }
    Ok(())
}
