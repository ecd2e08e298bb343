//! Implementation of `fuzzit check`.
//!
//! Maps every export in the manifest and reports each failure instead of
//! stopping at the first, so a manifest can be fixed in one pass.
//!
//! ```text
//! ✓ 12 exported functions map cleanly
//!
//! ✗ function 'blend': unknown type 'float' in 'float'
//! ✗ function 'pair': parameter 1 is void
//! ```
use anyhow::{Context, Result, anyhow};
use fuzzit_extract::{AnalysisProvider, ManifestProvider, SignatureExtractor};

use crate::CheckArgs;

/// Run the `fuzzit check` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or any export fails
/// to map; the main dispatcher turns that into exit code 1.
pub fn run(args: &CheckArgs) -> Result<()> {
    let manifest = ManifestProvider::load(&args.manifest)
        .with_context(|| format!("cannot load manifest {}", args.manifest.display()))?;

    // Check every export, denylisted or not.
    let extractor = SignatureExtractor::new(fuzzit_extract::Denylist::empty());
    let problems = extractor.diagnose(&manifest);

    if problems.is_empty() {
        let functions = manifest
            .exported_symbols()
            .iter()
            .filter(|symbol| manifest.describe(symbol).is_some())
            .count();
        println!(
            "✓ {functions} exported function{} map cleanly",
            if functions == 1 { "" } else { "s" }
        );
        return Ok(());
    }

    for problem in &problems {
        println!("✗ {problem}");
    }
    Err(anyhow!(
        "{} export{} failed to map",
        problems.len(),
        if problems.len() == 1 { "" } else { "s" }
    ))
}
