use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Scipion Team",
    version,
    about = "reliontomo - run RELION subtomogram averaging protocols (de novo initial model, tomogram reconstruction) from TOML run files.",
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

    /// RELION environment file (binary directory, MPI launcher).
    /// Falls back to $RELION_TOMO_ENV, then to the per-user configuration directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub environment: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a de novo 3D initial model from pseudo-subtomograms (relion_refine --denovo_3dref).
    Denovo(DeNovoArgs),
    /// Reconstruct a single tomogram from a pseudo-subtomogram set.
    Reconstruct(ReconstructArgs),
    /// Print the options a protocol accepts, with their defaults.
    Schema(SchemaArgs),
}

/// Options shared by the commands that launch a protocol.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the run file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Run directory; RELION writes its results into its `extra` subdirectory.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Set a single protocol option, overriding the run file and the flags above.
    /// Can be used multiple times. Example: -S number_of_classes=2
    #[arg(short = 'S', long = "set", value_name = "NAME=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Print the command that would be launched and exit without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `denovo` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DeNovoArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Override the number of threads.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Override the number of MPI processes.
    #[arg(long, value_name = "NUM")]
    pub mpi: Option<usize>,
}

/// Arguments for the `reconstruct` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ReconstructArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Override the tilt-series id of the tomogram to reconstruct.
    #[arg(short = 't', long, value_name = "ID")]
    pub tomo_id: Option<String>,

    /// Override the binning factor of the reconstruction.
    #[arg(short = 'b', long = "bin", value_name = "FLOAT")]
    pub bin_factor: Option<f64>,

    /// Override the number of threads.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Protocol whose options should be printed.
    #[arg(value_enum)]
    pub protocol: ProtocolKind,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Denovo,
    Reconstruct,
}
