#![no_main]

use fuzzit_extract::{ManifestProvider, SignatureExtractor};
use libfuzzer_sys::fuzz_target;

// Fuzz target: manifest JSON parsing and signature extraction.
//
// Catches bugs in:
// - Panics on malformed or oddly typed JSON
// - Extraction disagreeing with diagnose on the same manifest
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(manifest) = ManifestProvider::from_json(text) else {
        return;
    };
    let extractor = SignatureExtractor::default();
    let problems = extractor.diagnose(&manifest);
    if extractor.extract(&manifest).is_ok() {
        assert!(problems.is_empty());
    }
});
