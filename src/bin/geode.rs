//! Command-line interface for geode
//!
//! Usage:
//!   geode [OPTIONS] <FILE>...
//!
//! The first file is expanded into `<FILE><timestamp>.rb` (or `--out`). With
//! `--eval` the result is run through the interpreter together with the
//! remaining files; with `--irb` an irb session is started with it loaded.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::Utc;
use clap::{ArgAction, CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use geode::Expander;
use geode::runner::{DEFAULT_INTERPRETER, Options};

#[derive(Parser, Debug)]
#[command(
    name = "geode",
    version,
    about = "Expand shorthand notation into Ruby source"
)]
struct Cli {
    /// Shorthand source; any further files are handed to the interpreter
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Specify output file
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Run the output using ruby or the interpreter given by --rbi
    #[arg(short = 'e', long = "ev", alias = "eval")]
    eval: bool,

    /// Start irb with the output file loaded (turns --eval off)
    #[arg(short = 'i', long = "irb")]
    irb: bool,

    /// Arguments for the interpreter when --eval or --irb is used
    #[arg(
        short = 'a',
        long = "args",
        value_name = "ARGS",
        default_value = "",
        allow_hyphen_values = true
    )]
    args: String,

    /// Delete the output file after execution
    #[arg(short = 'd', long = "del")]
    delete: bool,

    /// Ruby interpreter used by --eval
    #[arg(short = 'I', long = "rbi", value_name = "PROGRAM", default_value = DEFAULT_INTERPRETER)]
    rbi: String,

    /// More log output (-v info, -vv debug, -vvv trace); GEODE_LOG overrides
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl From<Cli> for Options {
    fn from(cli: Cli) -> Self {
        Options {
            inputs: cli.inputs,
            output: cli.out,
            eval: cli.eval,
            irb: cli.irb,
            args: cli.args,
            delete: cli.delete,
            interpreter: cli.rbi,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("GEODE_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli, started_at: i64) -> Result<i32> {
    let plan = Options::from(cli).resolve(started_at)?;
    plan.execute(&Expander::new())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.inputs.is_empty() {
        println!("No input files.");
        let _ = Cli::command().print_help();
        process::exit(1);
    }

    let started_at = Utc::now().timestamp();
    match execute(cli, started_at) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}
