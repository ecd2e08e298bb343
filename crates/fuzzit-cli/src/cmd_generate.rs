//! Implementation of `fuzzit generate`.
//!
//! Loads the export manifest, extracts typed signatures (all usable
//! exports, or the one named by `--function`), and emits a harness.
//!
//! # Where the harness goes
//!
//! ```text
//! ┌──────────────────────┬────────────────────────────────────────────┐
//! │ Flags                │ Result                                     │
//! ├──────────────────────┼────────────────────────────────────────────┤
//! │ --print              │ stdout, nothing written                    │
//! │ -o <dir>             │ <dir>/<stem>_harness.c                     │
//! │ -o <file>            │ <file>                                     │
//! │ (neither)            │ ./<stem>_harness.c                         │
//! └──────────────────────┴────────────────────────────────────────────┘
//! ```
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use fuzzit_compiler::{
    Destination, HarnessConfig, InputSource, LoopStyle, Outcome, generate_all, generate_one,
    library_file_name,
};
use fuzzit_extract::{Denylist, ManifestProvider, SignatureExtractor};
use tracing::debug;

use crate::GenerateArgs;

/// Run the `fuzzit generate` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, a flag value is
/// unrecognised, a type fails to map, `--function` names no export, or
/// the harness cannot be written.
pub fn run(args: &GenerateArgs) -> Result<()> {
    let manifest = ManifestProvider::load(&args.manifest)
        .with_context(|| format!("cannot load manifest {}", args.manifest.display()))?;

    let library = args
        .library
        .clone()
        .unwrap_or_else(|| library_file_name(Path::new(&manifest.file)));

    let config = HarnessConfig {
        buffer_capacity: args.buffer_capacity,
        loop_style: parse_loop_style(&args.loop_style)?,
        input_source: parse_input_source(&args.input)?,
    };

    debug!(%library, ?config, "generating harness");

    let extractor = SignatureExtractor::new(Denylist::default().with(args.deny.iter().cloned()));
    let mut target = OutputTarget {
        output: args.output.as_deref(),
        print: args.print,
    };

    let outcome = match &args.function {
        Some(name) => {
            let raw = extractor.find(&manifest, name)?;
            generate_one(&raw, &extractor, &library, &config, &mut target)
        }
        None => generate_all(&manifest, &extractor, &library, &config, &mut target),
    }
    .with_context(|| format!("cannot generate harness for {library}"))?;

    match outcome {
        Outcome::NoUsableFunctions => {
            eprintln!("no usable functions in {}", args.manifest.display());
        }
        Outcome::NotWritten { harness } => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(harness.as_bytes())
                .context("cannot write to stdout")?;
        }
        Outcome::Written { path, functions } => {
            println!(
                "wrote {} ({functions} function{})",
                path.display(),
                if functions == 1 { "" } else { "s" }
            );
        }
    }

    Ok(())
}

/// Resolves the `-o` / `--print` flags to a concrete file.
struct OutputTarget<'a> {
    output: Option<&'a Path>,
    print: bool,
}

impl Destination for OutputTarget<'_> {
    fn choose(&mut self, suggested_name: &str) -> Option<PathBuf> {
        if self.print {
            return None;
        }
        match self.output {
            Some(dir) if dir.is_dir() => Some(dir.join(suggested_name)),
            Some(file) => Some(file.to_path_buf()),
            None => Some(PathBuf::from(suggested_name)),
        }
    }
}

// ── Flag parsers ──────────────────────────────────────────────────────────────

/// Parses the `--loop` string to a [`LoopStyle`].
///
/// # Errors
///
/// Returns an error for unrecognised loop names.
fn parse_loop_style(s: &str) -> Result<LoopStyle> {
    match s.to_lowercase().as_str() {
        "do-while" | "dowhile" => Ok(LoopStyle::DoWhile),
        "while" => Ok(LoopStyle::While),
        _ => Err(anyhow!("unknown loop style {s:?}: expected do-while|while")),
    }
}

/// Parses the `--input` string to an [`InputSource`].
///
/// # Errors
///
/// Returns an error for unrecognised input names.
fn parse_input_source(s: &str) -> Result<InputSource> {
    match s.to_lowercase().as_str() {
        "libfuzzer" => Ok(InputSource::LibFuzzer),
        "stdin" => Ok(InputSource::Stdin),
        _ => Err(anyhow!("unknown input {s:?}: expected libfuzzer|stdin")),
    }
}
