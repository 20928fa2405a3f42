use clap::{Parser, Subcommand};
use mino::diagnostics::ReduceError;
use mino::reduce::{self, ReduceOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mino", version, about = "The mino toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and type-check a package directory
    Build {
        /// Package directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Build and run a main package
    Run {
        /// Package directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Shrink a package while an error keeps reproducing
    Reduce {
        /// Package directory, reduced in place
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Regular expression the predicate output must keep matching
        #[arg(short, long = "match")]
        match_re: String,
        /// Shell command to use as the predicate instead of the built-in
        /// build/run
        #[arg(short, long)]
        cmd: Option<String>,
        /// Log every accepted change
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build { dir } => {
            let out = mino::build_output(&dir);
            if out.is_empty() {
                ExitCode::SUCCESS
            } else {
                let _ = std::io::stderr().write_all(&out);
                ExitCode::FAILURE
            }
        }
        Commands::Run { dir } => {
            let out = mino::run_output(&dir);
            let _ = std::io::stdout().write_all(&out);
            ExitCode::SUCCESS
        }
        Commands::Reduce { dir, match_re, cmd, verbose } => {
            let opts = ReduceOptions { dir, match_re, cmd, verbose };
            let mut stderr = std::io::stderr();
            match reduce::reduce(&opts, &mut stderr) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err @ ReduceError::NoReduction) => {
                    eprintln!("{}", err);
                    ExitCode::FAILURE
                }
                Err(err) => {
                    eprintln!("error: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
