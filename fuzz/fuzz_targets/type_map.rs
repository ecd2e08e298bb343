#![no_main]

use fuzzit_types::{TypeDescriptor, TypeMapper};
use libfuzzer_sys::fuzz_target;

// Fuzz target: TypeMapper::map on arbitrary descriptions.
//
// Catches bugs in:
// - Tokenising around pointer markers and qualifiers
// - Scalars escaping the {1, 2, 4, 8} width set
// - Non-deterministic results for the same text
fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let first = TypeMapper::map(raw);
    assert_eq!(first, TypeMapper::map(raw));
    if let Ok(TypeDescriptor::Scalar { ty, .. }) = first {
        assert!(matches!(ty.width_bytes(), 1 | 2 | 4 | 8));
    }
});
