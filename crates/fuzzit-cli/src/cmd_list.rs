//! Implementation of `fuzzit list`.
//!
//! Prints the signatures a harness would dispatch to, one per line, with
//! the selector values that reach each case:
//!
//! ```text
//! case 0  void beep(int)                  min 4 bytes
//! case 1  int greet(const char *)         min 4 bytes
//! ```
use anyhow::{Context, Result};
use fuzzit_extract::{Denylist, ManifestProvider, SignatureExtractor};

use crate::ListArgs;

/// Run the `fuzzit list` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or any export fails
/// to map.
pub fn run(args: &ListArgs) -> Result<()> {
    let manifest = ManifestProvider::load(&args.manifest)
        .with_context(|| format!("cannot load manifest {}", args.manifest.display()))?;
    let extractor = SignatureExtractor::new(Denylist::default().with(args.deny.iter().cloned()));
    let signatures = extractor
        .extract(&manifest)
        .with_context(|| format!("cannot extract signatures from {}", manifest.file))?;

    if signatures.is_empty() {
        println!("no usable functions in {}", manifest.file);
        return Ok(());
    }

    for (index, signature) in signatures.iter().enumerate() {
        println!(
            "case {index:<3} {:<40} min {} bytes",
            signature.to_string(),
            signature.min_input_bytes()
        );
    }
    Ok(())
}
