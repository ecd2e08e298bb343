//! Shared fixtures for the integration tests and benches.
//!
//! Signatures are built from the same type spellings an export manifest
//! carries, so every fixture goes through `TypeMapper` exactly as real
//! input would.

pub mod sim;

use fuzzit_compiler::{HarnessConfig, HarnessSpec, build_unit};
use fuzzit_extract::{Denylist, RawSignature, SignatureExtractor};
use fuzzit_ir::TranslationUnit;
use fuzzit_types::FunctionSignature;

/// Library name used by fixtures unless a test says otherwise.
pub const LIBRARY: &str = "libdemo.so";

/// Map a signature from provider-style type spellings.
///
/// # Panics
///
/// Panics if a spelling does not map; fixtures are expected to be valid.
pub fn signature(name: &str, return_type: &str, parameters: &[&str]) -> FunctionSignature {
    let raw = RawSignature::new(name, return_type, parameters.iter().copied());
    SignatureExtractor::new(Denylist::empty())
        .extract_one(&raw)
        .unwrap_or_else(|e| panic!("fixture {name} failed to map: {e}"))
        .unwrap_or_else(|| panic!("fixture {name} was filtered out"))
}

/// Lower `signatures` into a harness for [`LIBRARY`].
///
/// # Panics
///
/// Panics if [`HarnessSpec::new`] rejects the inputs.
pub fn harness(signatures: Vec<FunctionSignature>, config: HarnessConfig) -> TranslationUnit {
    let spec = HarnessSpec::new(LIBRARY, signatures, config)
        .unwrap_or_else(|e| panic!("harness spec rejected: {e}"));
    build_unit(&spec).unwrap_or_else(|e| panic!("harness lowering failed: {e}"))
}

/// Lower `signatures` with the default configuration.
///
/// # Panics
///
/// Panics if [`HarnessSpec::new`] rejects the inputs.
pub fn default_harness(signatures: Vec<FunctionSignature>) -> TranslationUnit {
    harness(signatures, HarnessConfig::default())
}

/// A stream chunk: one selector byte followed by `payload`.
pub fn call(selector: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(selector);
    out.extend_from_slice(payload);
    out
}

/// A length-prefixed buffer as a pointer parameter reads it.
pub fn text(bytes: &[u8]) -> Vec<u8> {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    let mut out = len.to_le_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}
