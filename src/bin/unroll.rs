//! A small command-line front end for the loop unroller: reads one μAsm
//! assembly file, unrolls its first loop, and emits the transformed
//! assembly to stdout or a file.

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use transient_trace_extractor::{
    assembly::{emitter, parser},
    cfg::unroll::unroll,
    constant::DEFAULT_UNROLL_BOUND,
};

/// Unroll the loops of a μAsm assembly program.
#[derive(Debug, Parser)]
#[command(name = "unroll", version, about)]
struct Args {
    /// The assembly file to read.
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the unrolled assembly; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How many times to replicate the loop body.
    #[arg(short = 'n', long, default_value_t = DEFAULT_UNROLL_BOUND)]
    unroll_bound: usize,

    /// Log progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.verbose {
        let _ = simple_logger(log::LevelFilter::Debug);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let source = fs::read_to_string(&args.input)
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;

    let program = parser::parse(&source).map_err(|e| format!("failed to parse assembly: {e}"))?;
    let unrolled =
        unroll(&program, args.unroll_bound).map_err(|e| format!("failed to unroll: {e}"))?;
    let text = emitter::emit(&unrolled);

    match &args.output {
        Some(path) => fs::write(path, text)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?,
        None => print!("{text}"),
    }

    Ok(())
}

/// Installs a minimal stderr logger so `--verbose` has something to show.
fn simple_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    struct StderrLogger;

    impl log::Log for StderrLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            eprintln!("[{}] {}", record.level(), record.args());
        }

        fn flush(&self) {}
    }

    static LOGGER: StderrLogger = StderrLogger;
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
