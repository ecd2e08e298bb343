#![no_main]

use arbitrary::Arbitrary;
use fuzzit_compiler::{HarnessConfig, HarnessSpec, InputSource, LoopStyle, build_unit};
use fuzzit_tests::signature;
use fuzzit_tests::sim::{SimOptions, run_libfuzzer_with, run_stdin_with};
use fuzzit_types::TypeMapper;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzFunction {
    name: String,
    return_id: u8,
    parameters: Vec<(u8, bool, bool)>,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    functions: Vec<FuzzFunction>,
    capacity: u16,
    use_while: bool,
    use_stdin: bool,
    malloc_limit: Option<u8>,
    stream: Vec<u8>,
}

/// Build a type spelling from a table token plus optional qualifiers.
fn spelling(id: u8, pointer: bool, constant: bool) -> String {
    let table = TypeMapper::TABLE;
    let (token, _) = table[usize::from(id) % table.len()];
    let token = if token == "void" && !pointer { "int" } else { token };
    let mut out = String::new();
    if constant {
        out.push_str("const ");
    }
    out.push_str(token);
    if pointer {
        out.push('*');
    }
    out
}

// Fuzz target: compile arbitrary signature sets and run the harness.
//
// Catches bugs in:
// - Handle naming collisions producing clashing C identifiers
// - Guards that let a read run past the chunk
// - Buffers leaked or double-freed on an early bail
fuzz_target!(|input: FuzzInput| {
    let signatures: Vec<_> = input
        .functions
        .iter()
        .take(16)
        .filter(|f| !f.name.is_empty())
        .map(|f| {
            let params: Vec<String> = f
                .parameters
                .iter()
                .take(6)
                .map(|&(id, pointer, constant)| spelling(id, pointer, constant))
                .collect();
            let params: Vec<&str> = params.iter().map(String::as_str).collect();
            signature(&f.name, &spelling(f.return_id, false, false), &params)
        })
        .collect();
    if signatures.is_empty() {
        return;
    }

    let config = HarnessConfig {
        buffer_capacity: usize::from(input.capacity % 1024) + 1,
        loop_style: if input.use_while { LoopStyle::While } else { LoopStyle::DoWhile },
        input_source: if input.use_stdin { InputSource::Stdin } else { InputSource::LibFuzzer },
    };
    let Ok(spec) = HarnessSpec::new("libfuzz.so", signatures, config.clone()) else {
        return;
    };
    let unit = build_unit(&spec).expect("a valid spec always lowers");

    let options = SimOptions {
        malloc_limit: input.malloc_limit.map(usize::from),
        ..SimOptions::default()
    };
    let report = match config.input_source {
        InputSource::LibFuzzer => run_libfuzzer_with(&unit, &input.stream, options),
        InputSource::Stdin => run_stdin_with(&unit, &input.stream, options),
    }
    .unwrap_or_else(|fault| panic!("harness fault: {fault}"));
    assert_eq!(report.status, 0);
    assert_eq!(report.leaked, 0);
});
