use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "rsmarthe CLI - A command-line interface for coupling the MARTHE groundwater simulator with PEST-style parameter estimation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the complete PEST estimation interface for a model: parameter
    /// data, template, instruction and control files.
    Setup(SetupArgs),
    /// Perform one forward run: apply the parameter data files to the model,
    /// run the simulator and extract the simulated series.
    Forward(ForwardArgs),
    /// Run the MARTHE simulator on a model, streaming its output.
    Run(RunArgs),
    /// Split a simulated-history file into one record file per locality.
    Extract(ExtractArgs),
    /// Print the value of a property field at a point.
    Sample(SampleArgs),
}

/// Arguments for the `setup` subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Path to the calibration settings file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,
}

/// Arguments for the `forward` subcommand.
#[derive(Args, Debug)]
pub struct ForwardArgs {
    /// Path to the calibration settings file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the model's .rma file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub rma: PathBuf,

    /// Name of, or path to, the simulator executable.
    #[arg(short, long, value_name = "NAME_OR_PATH", default_value = "marthe")]
    pub exe: String,

    /// Do not echo the simulator's output while it runs.
    #[arg(long)]
    pub silent: bool,

    /// Extra arguments appended to the simulator invocation, after `--`.
    #[arg(last = true, value_name = "ARGS")]
    pub extra_args: Vec<String>,
}

/// Arguments for the `extract` subcommand.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Path to the simulated-history file (historiq.prn).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub prn: PathBuf,

    /// Directory the per-locality record files are written to.
    #[arg(short, long, value_name = "DIR", default_value = "sim")]
    pub out: PathBuf,
}

/// Arguments for the `sample` subcommand.
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Path to the model's .rma file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub rma: PathBuf,

    /// Property keyword to sample (e.g. permh).
    #[arg(short, long, required = true, value_name = "NAME")]
    pub prop: String,

    /// X coordinate of the sampling point.
    #[arg(short, required = true, value_name = "FLOAT", allow_hyphen_values = true)]
    pub x: f64,

    /// Y coordinate of the sampling point.
    #[arg(short, required = true, value_name = "FLOAT", allow_hyphen_values = true)]
    pub y: f64,

    /// Layer number, starting at 1.
    #[arg(short, long, value_name = "INT", default_value_t = 1)]
    pub layer: usize,
}
