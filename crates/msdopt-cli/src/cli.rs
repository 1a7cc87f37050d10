use clap::{Args, Parser, Subcommand};
use msdopt::engine::config::SimilarityKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "msdopt - Fits the hyperparameters that turn multistate design energies into predicted residue frequencies against an observed sequence alignment.",
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

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the hyperparameter grid for the model that best reproduces an alignment.
    Optimize(OptimizeArgs),
    /// Compute the residue frequency profile of an alignment and export it as FASTA.
    Profile(ProfileArgs),
}

/// Arguments for the `optimize` subcommand.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Inputs ---
    /// Override the target alignment (FASTA).
    #[arg(short, long, value_name = "PATH")]
    pub alignment: Option<PathBuf>,

    /// Override the reindex table mapping alignment columns to sequence positions.
    #[arg(long, value_name = "PATH")]
    pub reindex: Option<PathBuf>,

    /// Load energies from a per-macrostate table.
    #[arg(long, value_name = "PATH", conflicts_with = "microstate_table")]
    pub macrostate_table: Option<PathBuf>,

    /// Load energies from a per-microstate (backbone) table.
    #[arg(long, value_name = "PATH")]
    pub microstate_table: Option<PathBuf>,

    /// First designed sequence position of a microstate table.
    #[arg(long, value_name = "INT", allow_hyphen_values = true)]
    pub min_position: Option<i64>,

    /// Override the macrostate names, in table order. Comma separated.
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub macrostates: Vec<String>,

    /// Treat designed positions as sparse; requires a reindex table.
    #[arg(long)]
    pub noncontiguous: bool,

    // --- Search ---
    /// Override the search grid with a standalone TOML file.
    #[arg(short, long, value_name = "PATH")]
    pub grid: Option<PathBuf>,

    /// Override the similarity measure (cosine, jensen-shannon).
    #[arg(short, long, value_name = "NAME")]
    pub similarity: Option<SimilarityKind>,

    // --- Outputs ---
    /// Write the best parameters report to this path.
    #[arg(short, long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Write the best predicted frequencies as a FASTA pseudo-alignment.
    #[arg(short, long, value_name = "PATH")]
    pub frequencies: Option<PathBuf>,

    /// Override the decimal precision of the frequency FASTA.
    #[arg(long, value_name = "INT")]
    pub precision: Option<u32>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.similarity=cosine
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `profile` subcommand.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Path to the alignment (FASTA).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub alignment: PathBuf,

    /// Restrict and reorder the profile with a reindex table.
    #[arg(long, value_name = "PATH")]
    pub reindex: Option<PathBuf>,

    /// Path for the exported pseudo-alignment.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Number of decimal places the pseudo-alignment resolves.
    #[arg(long, value_name = "INT", default_value_t = 3)]
    pub precision: u32,
}
