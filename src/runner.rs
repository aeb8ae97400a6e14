//! Read → expand → write, then optionally hand the result to Ruby.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::processor::{Expander, ExpandingReader};

pub const DEFAULT_INTERPRETER: &str = "ruby";

/// Run options as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub eval: bool,
    pub irb: bool,
    /// Extra arguments for the interpreter or irb, whitespace separated
    pub args: String,
    pub delete: bool,
    pub interpreter: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: None,
            eval: false,
            irb: false,
            args: String::new(),
            delete: false,
            interpreter: DEFAULT_INTERPRETER.to_string(),
        }
    }
}

/// What happens once the output file exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WriteOnly,
    Eval,
    Irb,
}

/// Options with every default settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub input: PathBuf,
    /// Passed to the interpreter after the generated file
    pub extra_inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub action: Action,
    pub args: Vec<String>,
    pub delete: bool,
    pub interpreter: String,
}

impl Options {
    /// Settle defaults. `started_at` is the Unix timestamp used in the
    /// default output name.
    pub fn resolve(self, started_at: i64) -> Result<Plan> {
        let mut inputs = self.inputs.into_iter();
        let Some(input) = inputs.next() else {
            bail!("No input files.");
        };
        let output = self
            .output
            .unwrap_or_else(|| default_output(&input, started_at));
        // irb wins over eval
        let action = if self.irb {
            Action::Irb
        } else if self.eval {
            Action::Eval
        } else {
            Action::WriteOnly
        };

        Ok(Plan {
            input,
            extra_inputs: inputs.collect(),
            output,
            action,
            args: self.args.split_whitespace().map(str::to_string).collect(),
            delete: self.delete,
            interpreter: self.interpreter,
        })
    }
}

/// `<input><timestamp>.rb`
pub fn default_output(input: &Path, timestamp: i64) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(timestamp.to_string());
    name.push(".rb");
    PathBuf::from(name)
}

/// Expand `input` into `output`. The output file is only written once the
/// whole input has expanded.
pub fn transform(input: &Path, output: &Path, expander: &Expander) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;

    let mut expanded = String::new();
    ExpandingReader::new(file, expander.clone())
        .read_to_string(&mut expanded)
        .with_context(|| format!("failed to expand {}", input.display()))?;

    fs::write(output, &expanded)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = expanded.len(),
        "wrote expanded source"
    );
    Ok(())
}

impl Plan {
    /// The follow-up process, if the plan asks for one
    pub fn command(&self) -> Option<Command> {
        match self.action {
            Action::WriteOnly => None,
            Action::Eval => {
                let mut cmd = Command::new(&self.interpreter);
                cmd.arg(&self.output)
                    .args(&self.extra_inputs)
                    .args(&self.args);
                Some(cmd)
            }
            Action::Irb => {
                let mut cmd = Command::new("irb");
                cmd.arg("-r")
                    .arg(Path::new(".").join(&self.output))
                    .args(&self.args);
                Some(cmd)
            }
        }
    }

    /// Transform, run the follow-up process and clean up. Returns the exit
    /// code geode should finish with.
    pub fn execute(&self, expander: &Expander) -> Result<i32> {
        transform(&self.input, &self.output, expander)?;

        let status = self.command().map(spawn).transpose();
        if self.delete {
            remove_output(&self.output)?;
        }
        Ok(status?.map_or(0, exit_code))
    }
}

fn spawn(mut cmd: Command) -> Result<ExitStatus> {
    info!(command = ?cmd, "running");
    cmd.status()
        .with_context(|| format!("failed to start {}", cmd.get_program().to_string_lossy()))
}

fn exit_code(status: ExitStatus) -> i32 {
    // killed by a signal
    status.code().unwrap_or(1)
}

fn remove_output(output: &Path) -> Result<()> {
    if output.exists() {
        fs::remove_file(output)
            .with_context(|| format!("failed to delete {}", output.display()))?;
        info!(output = %output.display(), "deleted generated file");
    }
    Ok(())
}
