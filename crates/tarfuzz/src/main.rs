use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use tarfuzz::campaign::Campaign;

/// Generation-based robustness harness for tar extractors
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the extractor executable under test
    extractor: PathBuf,
}

fn run(args: Args) -> Result<()> {
    println!();
    println!("--- Starting the following generation-based fuzzer ---");
    println!("{}", args.extractor.display());

    // Refuse to start a campaign against a path that doesn't open.
    File::open(&args.extractor)
        .with_context(|| format!("the extractor {:?} can't be opened", args.extractor))?;

    let workdir = std::env::current_dir().context("can't determine the working directory")?;
    Campaign::new(args.extractor, workdir).run();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let is_usage_error = err.use_stderr();
            let _ = err.print();
            return if is_usage_error {
                ExitCode::from(255)
            } else {
                // --help and --version land here.
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(255)
        }
    }
}
