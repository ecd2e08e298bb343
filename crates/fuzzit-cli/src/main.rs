//! Fuzzit command-line tool: turn an export manifest of a shared library
//! into a C fuzzing harness.
//!
//! # Command overview
//!
//! ```text
//! fuzzit <COMMAND> [OPTIONS]
//!
//! Commands:
//!   generate   Emit a harness for every usable export (or one function)
//!   list       Print the typed signatures a harness would dispatch to
//!   check      Report every export whose types cannot be mapped
//!   help       Print help information
//!
//! Global options:
//!   -v, --verbose    Log at debug level (RUST_LOG overrides)
//!   -h, --help       Print help
//!   -V, --version    Print version
//! ```
//!
//! # Exit codes
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | Error (I/O failure, bad manifest, unmapped type) |
//!
//! Errors and logs go to stderr so a printed harness can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_check;
mod cmd_generate;
mod cmd_list;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// The fuzzit command-line tool.
#[derive(Parser)]
#[command(name = "fuzzit", version, about = "Signature-to-harness compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (per-case sizes, skipped symbols).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Emit a C fuzzing harness from an export manifest.
    Generate(GenerateArgs),
    /// Print the signatures a harness would dispatch to, in case order.
    List(ListArgs),
    /// Report every export whose types cannot be mapped.
    Check(CheckArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `fuzzit generate`.
///
/// ```text
/// ┌───────────────────┬─────────────────────────────────────────────────┐
/// │ Flag              │ Values / default                                │
/// ├───────────────────┼─────────────────────────────────────────────────┤
/// │ --library         │ dlopen name (default: manifest "file")          │
/// │ --function        │ harness a single export instead of all of them  │
/// │ -o / --output     │ file, or directory for <stem>_harness.c         │
/// │ --print           │ write the harness to stdout                     │
/// │ --buffer-capacity │ bytes per read (default 512)                    │
/// │ --loop            │ do-while (default) | while                      │
/// │ --input           │ libfuzzer (default) | stdin                     │
/// │ --deny            │ extra symbol to skip (repeatable)               │
/// └───────────────────┴─────────────────────────────────────────────────┘
/// ```
///
/// Without `-o`, the harness is written to `<stem>_harness.c` in the current
/// directory unless `--print` is given.
#[derive(clap::Args)]
pub struct GenerateArgs {
    /// Path to the JSON export manifest.
    pub manifest: PathBuf,

    /// Library file name the harness passes to `dlopen`.
    #[arg(long)]
    pub library: Option<String>,

    /// Generate for this function only.
    #[arg(long)]
    pub function: Option<String>,

    /// Output file, or an existing directory to write into.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the harness to stdout instead of writing a file.
    #[arg(long)]
    pub print: bool,

    /// Bytes read from the input per outer loop iteration.
    #[arg(long, default_value_t = 512)]
    pub buffer_capacity: usize,

    /// Outer loop shape: `do-while` or `while`.
    #[arg(long = "loop", default_value = "do-while")]
    pub loop_style: String,

    /// Input source: `libfuzzer` or `stdin`.
    #[arg(long, default_value = "libfuzzer")]
    pub input: String,

    /// Additional symbol names to skip.
    #[arg(long = "deny")]
    pub deny: Vec<String>,
}

/// Arguments for `fuzzit list`.
#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the JSON export manifest.
    pub manifest: PathBuf,

    /// Additional symbol names to skip.
    #[arg(long = "deny")]
    pub deny: Vec<String>,
}

/// Arguments for `fuzzit check`.
#[derive(clap::Args)]
pub struct CheckArgs {
    /// Path to the JSON export manifest.
    pub manifest: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Generate(args) => cmd_generate::run(&args),
        Commands::List(args) => cmd_list::run(&args),
        Commands::Check(args) => cmd_check::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
