//! Command-line interface for the parlr calculator.
//!
//! Reads calculator statements from a file (or standard input), parses them
//! through [`CalcParser`], and prints one result per statement. Diagnostics
//! from the runtime flow through `env_logger`; run with `RUST_LOG=debug`
//! together with `--debug` for shift/reduce traces.

use clap::{Parser as ClapParser, Subcommand};
use parlr_calc::CalcParser;
use smartstring::alias::String;
use std::io::Read;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parses and evaluates calculator statements
    Parse {
        /// Input file with calculator statements, or "-" for stdin
        #[arg(short, long)]
        input: String,

        /// Emit shift/reduce traces while parsing
        #[arg(short, long)]
        debug: bool,
    },
}

fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path)
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Parse { input: path, debug } => {
            let bytes = read_input(&path).expect(&format!("can't open {:?}", path));
            let mut parser = CalcParser::new(bytes.into_iter());
            let results = if debug { parser.debug_parse() } else { parser.parse() };
            match results {
                Ok(results) => {
                    for r in results {
                        println!("{}", r);
                    }
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
