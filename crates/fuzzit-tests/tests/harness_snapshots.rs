//! Rendered harness snapshots.
//!
//! The whole generated C file is pinned so any change to layout, naming,
//! or guard arithmetic shows up as a reviewable diff. Accept deliberate
//! changes with `cargo insta review`.

use fuzzit_compiler::{HarnessConfig, HarnessSpec, InputSource, LoopStyle, render_harness};
use fuzzit_tests::{LIBRARY, signature};
use insta::assert_snapshot;

fn render(spec: &HarnessSpec) -> String {
    render_harness(spec).unwrap_or_else(|e| panic!("render failed: {e}"))
}

// ── Defaults ──────────────────────────────────────────────────────────────────

#[test]
fn single_scalar_libfuzzer() {
    let spec = HarnessSpec::new(
        LIBRARY,
        vec![signature("beep", "void", &["int32_t"])],
        HarnessConfig::default(),
    )
    .unwrap();
    assert_snapshot!("single_scalar_libfuzzer", render(&spec));
}

// ── Variants ──────────────────────────────────────────────────────────────────

#[test]
fn pointers_stdin_while() {
    let config = HarnessConfig {
        buffer_capacity: 64,
        loop_style: LoopStyle::While,
        input_source: InputSource::Stdin,
    };
    let spec = HarnessSpec::new(
        LIBRARY,
        vec![
            signature("greet", "int32_t", &["char const*"]),
            signature("pair", "void", &["char*", "char*"]),
        ],
        config,
    )
    .unwrap();
    assert_snapshot!("pointers_stdin_while", render(&spec));
}
