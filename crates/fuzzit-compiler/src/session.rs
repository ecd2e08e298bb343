use std::fs;
use std::path::{Path, PathBuf};

use fuzzit_extract::{AnalysisProvider, RawSignature, SignatureExtractor};
use fuzzit_ir::TranslationUnit;
use fuzzit_types::FunctionSignature;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::dispatch::DispatchCompiler;
use crate::emitter::HarnessEmitter;
use crate::error::CompileError;
use crate::harness::{HarnessSpec, library_stem};

/// Where a generated harness should be written.
///
/// The session proposes a file name; returning `None` declines, and the
/// harness text is handed back in [`Outcome::NotWritten`] instead.
pub trait Destination {
    fn choose(&mut self, suggested_name: &str) -> Option<PathBuf>;
}

/// A fixed path, or `None` to never write.
impl Destination for Option<PathBuf> {
    fn choose(&mut self, _suggested_name: &str) -> Option<PathBuf> {
        self.clone()
    }
}

/// Write into a directory using the suggested file name.
impl Destination for &Path {
    fn choose(&mut self, suggested_name: &str) -> Option<PathBuf> {
        Some(self.join(suggested_name))
    }
}

/// Result of a generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing survived filtering; no harness was produced.
    NoUsableFunctions,
    /// The destination declined; here is the harness anyway.
    NotWritten { harness: String },
    /// The harness was written to `path`.
    Written { path: PathBuf, functions: usize },
}

/// Lower a spec to its translation unit.
///
/// # Errors
///
/// Returns [`CompileError::NoFunctions`] if `spec` has no functions.
pub fn build_unit(spec: &HarnessSpec) -> Result<TranslationUnit, CompileError> {
    let cases = DispatchCompiler::compile(spec.functions())?;
    Ok(HarnessEmitter::emit(spec, &cases))
}

/// Lower and pretty-print a spec.
///
/// # Errors
///
/// See [`build_unit`].
pub fn render_harness(spec: &HarnessSpec) -> Result<String, CompileError> {
    Ok(fuzzit_ir::render(&build_unit(spec)?))
}

/// Generate a harness covering every usable export of `provider`.
///
/// # Errors
///
/// Returns [`CompileError::Extract`] if a signature fails to map,
/// [`CompileError::InvalidConfig`] / [`CompileError::InvalidLibraryName`]
/// for bad inputs, or [`CompileError::Io`] if writing fails.
pub fn generate_all<P>(
    provider: &P,
    extractor: &SignatureExtractor,
    library: &str,
    config: &HarnessConfig,
    destination: &mut dyn Destination,
) -> Result<Outcome, CompileError>
where
    P: AnalysisProvider + ?Sized,
{
    let signatures = extractor.extract(provider)?;
    finish(signatures, library, config, destination)
}

/// Generate a harness for a single function.
///
/// The denylist still applies: a denylisted function yields
/// [`Outcome::NoUsableFunctions`].
///
/// # Errors
///
/// As for [`generate_all`].
pub fn generate_one(
    raw: &RawSignature,
    extractor: &SignatureExtractor,
    library: &str,
    config: &HarnessConfig,
    destination: &mut dyn Destination,
) -> Result<Outcome, CompileError> {
    let signatures: Vec<FunctionSignature> = extractor.extract_one(raw)?.into_iter().collect();
    finish(signatures, library, config, destination)
}

fn finish(
    signatures: Vec<FunctionSignature>,
    library: &str,
    config: &HarnessConfig,
    destination: &mut dyn Destination,
) -> Result<Outcome, CompileError> {
    if signatures.is_empty() {
        warn!(library, "no usable functions found");
        return Ok(Outcome::NoUsableFunctions);
    }
    let functions = signatures.len();
    let spec = HarnessSpec::new(library, signatures, config.clone())?;
    let harness = render_harness(&spec)?;

    let Some(path) = destination.choose(&suggested_file_name(library)) else {
        return Ok(Outcome::NotWritten { harness });
    };
    fs::write(&path, harness)?;
    info!(path = %path.display(), functions, library, "harness written");
    Ok(Outcome::Written { path, functions })
}

/// File name component of `path`, as passed to `dlopen`.
pub fn library_file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// `<stem>_harness.c` for a library file name.
pub(crate) fn suggested_file_name(library: &str) -> String {
    format!("{}_harness.c", library_stem(library))
}

#[cfg(test)]
mod tests {
    use fuzzit_extract::{Denylist, ManifestProvider};

    use super::*;

    fn manifest() -> ManifestProvider {
        ManifestProvider::new("libdemo.so")
            .function("beep", "void", &["int32_t"])
            .function("greet", "int32_t", &["char const*"])
            .function("frame_dummy", "void", &[])
            .data("counter")
    }

    #[test]
    fn not_written_returns_text() {
        let outcome = generate_all(
            &manifest(),
            &SignatureExtractor::default(),
            "libdemo.so",
            &HarnessConfig::default(),
            &mut None::<PathBuf>,
        )
        .unwrap();
        let Outcome::NotWritten { harness } = outcome else {
            panic!("expected NotWritten, got {outcome:?}");
        };
        assert!(harness.contains("switch (choice % 2)"));
        assert!(!harness.contains("frame_dummy"));
    }

    #[test]
    fn writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut destination = dir.path();
        let outcome = generate_all(
            &manifest(),
            &SignatureExtractor::default(),
            "libdemo.so",
            &HarnessConfig::default(),
            &mut destination,
        )
        .unwrap();
        let expected = dir.path().join("libdemo_harness.c");
        assert_eq!(
            outcome,
            Outcome::Written {
                path: expected.clone(),
                functions: 2
            }
        );
        let text = fs::read_to_string(expected).unwrap();
        assert!(text.contains("LLVMFuzzerTestOneInput"));
    }

    #[test]
    fn empty_provider_reports_no_usable_functions() {
        let provider = ManifestProvider::new("libempty.so").data("counter");
        let outcome = generate_all(
            &provider,
            &SignatureExtractor::default(),
            "libempty.so",
            &HarnessConfig::default(),
            &mut None::<PathBuf>,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::NoUsableFunctions);
    }

    #[test]
    fn generate_one_respects_denylist() {
        let raw = RawSignature::new("frame_dummy", "void", ["void"]);
        let outcome = generate_one(
            &raw,
            &SignatureExtractor::default(),
            "libdemo.so",
            &HarnessConfig::default(),
            &mut None::<PathBuf>,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::NoUsableFunctions);

        let permissive = SignatureExtractor::new(Denylist::empty());
        let outcome = generate_one(
            &raw,
            &permissive,
            "libdemo.so",
            &HarnessConfig::default(),
            &mut None::<PathBuf>,
        )
        .unwrap();
        assert!(matches!(outcome, Outcome::NotWritten { .. }));
    }

    #[test]
    fn unknown_type_propagates() {
        let raw = RawSignature::new("f", "void", ["float"]);
        let result = generate_one(
            &raw,
            &SignatureExtractor::default(),
            "libdemo.so",
            &HarnessConfig::default(),
            &mut None::<PathBuf>,
        );
        assert!(matches!(result, Err(CompileError::Extract(_))));
    }

    #[test]
    fn file_name_helpers() {
        assert_eq!(library_file_name(Path::new("/opt/lib/libdemo.so")), "libdemo.so");
        assert_eq!(suggested_file_name("libdemo.so.1"), "libdemo_harness.c");
    }
}
