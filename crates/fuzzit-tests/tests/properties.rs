//! Runtime properties of generated harnesses.
//!
//! These run the lowered translation unit in the simulator, which faults on
//! any out-of-bounds access, double free, or use of freed memory, so a test
//! that merely completes has already shown the harness stayed in bounds.

use fuzzit_compiler::{DispatchCompiler, HarnessConfig, HarnessSpec, InputSource, LoopStyle};
use fuzzit_ir::render_stmts;
use fuzzit_tests::sim::{
    Arg, Machine, Report, SimOptions, run_libfuzzer, run_libfuzzer_with, run_stdin,
    run_stdin_with,
};
use fuzzit_tests::{LIBRARY, call, default_harness, harness, signature, text};
use fuzzit_types::TypeMapper;

fn only_args(report: &Report) -> Vec<Vec<Arg>> {
    report.calls.iter().map(|c| c.args.clone()).collect()
}

// ── Width totality ────────────────────────────────────────────────────────────

#[test]
fn every_table_token_has_a_harness_width() {
    for &(token, _) in TypeMapper::TABLE {
        let width = TypeMapper::map(token).unwrap().width_bytes().unwrap();
        assert!(matches!(width, 1 | 2 | 4 | 8), "{token} -> {width}");
    }
    for token in ["float", "double", "long", "size_t", "struct", "bool"] {
        assert!(TypeMapper::map(token).is_err(), "{token} should not map");
        assert_eq!(TypeMapper::map(token), TypeMapper::map(token));
    }
}

// ── Offset exactness ──────────────────────────────────────────────────────────

#[test]
fn scalar_offsets_are_cumulative_widths() {
    let spec = HarnessSpec::new(
        LIBRARY,
        vec![signature(
            "mix",
            "void",
            &["char", "int16_t", "int32_t", "int64_t"],
        )],
        HarnessConfig::default(),
    )
    .unwrap();
    let case = DispatchCompiler::compile(spec.functions()).unwrap().remove(0);
    let body = render_stmts(&case.body(), 0);

    assert_eq!(case.consumed.constant(), Some(15));
    assert!(body.contains("memcpy(&l_0_0, Data, sizeof(char));"), "{body}");
    assert!(body.contains("memcpy(&l_0_1, Data + 1, sizeof(short int));"), "{body}");
    assert!(body.contains("memcpy(&l_0_2, Data + 3, sizeof(int));"), "{body}");
    assert!(body.contains("memcpy(&l_0_3, Data + 7, sizeof(long long int));"), "{body}");
    assert!(body.ends_with("return 15;\n"), "{body}");
}

#[test]
fn scalar_values_decode_at_their_offsets() {
    let unit = default_harness(vec![signature(
        "mix",
        "void",
        &["char", "int16_t", "int32_t", "int64_t"],
    )]);
    let mut payload = vec![0xFE];
    payload.extend(0x1234i16.to_le_bytes());
    payload.extend((-5i32).to_le_bytes());
    payload.extend(0x0102_0304_0506_0708i64.to_le_bytes());
    let mut input = call(0, &payload);
    input.extend(call(0, &payload));

    let report = run_libfuzzer(&unit, &input).unwrap();

    let expected = vec![
        Arg::Int(-2),
        Arg::Int(0x1234),
        Arg::Int(-5),
        Arg::Int(0x0102_0304_0506_0708),
    ];
    assert_eq!(only_args(&report), vec![expected.clone(), expected]);
}

#[test]
fn unsigned_scalars_are_not_sign_extended() {
    let unit = default_harness(vec![signature("u", "void", &["uint8_t", "uint32_t"])]);
    let mut payload = vec![0xFF];
    payload.extend(u32::MAX.to_le_bytes());

    let report = run_libfuzzer(&unit, &call(0, &payload)).unwrap();

    assert_eq!(
        only_args(&report),
        vec![vec![Arg::Int(255), Arg::Int(i64::from(u32::MAX))]]
    );
}

// ── Pointer accounting ────────────────────────────────────────────────────────

#[test]
fn int_then_pointer_consumes_eight_plus_length() {
    let spec = HarnessSpec::new(
        LIBRARY,
        vec![signature("f", "void", &["int32_t", "char*"])],
        HarnessConfig::default(),
    )
    .unwrap();
    let case = DispatchCompiler::compile(spec.functions()).unwrap().remove(0);
    let body = render_stmts(&case.body(), 0);

    assert_eq!(case.consumed.to_string(), "8 + len_0_1");
    assert!(body.contains("memcpy(&len_0_1, Data + 4, sizeof(unsigned int));"));
    assert!(body.contains("memcpy(buf_0_1, Data + 8, len_0_1);"));
    assert!(body.contains("buf_0_1[len_0_1] = 0;"));
}

#[test]
fn int_then_pointer_runs_back_to_back() {
    let unit = default_harness(vec![signature("f", "void", &["int32_t", "char*"])]);
    let mut first = 7i32.to_le_bytes().to_vec();
    first.extend(text(b"ok"));
    let mut second = 9i32.to_le_bytes().to_vec();
    second.extend(text(b""));
    let mut input = call(0, &first);
    input.extend(call(0, &second));

    let report = run_libfuzzer(&unit, &input).unwrap();

    assert_eq!(
        only_args(&report),
        vec![
            vec![Arg::Int(7), Arg::Bytes(b"ok".to_vec())],
            vec![Arg::Int(9), Arg::Bytes(Vec::new())],
        ]
    );
    assert_eq!(report.allocations, 2);
    assert_eq!(report.leaked, 0);
}

#[test]
fn embedded_nul_is_copied_verbatim() {
    let unit = default_harness(vec![signature("greet", "void", &["char*"])]);
    // the callee sees a C string, so it stops at the first NUL
    let report = run_libfuzzer(&unit, &call(0, &text(b"a\0b"))).unwrap();
    assert_eq!(only_args(&report), vec![vec![Arg::Bytes(b"a".to_vec())]]);
    assert_eq!(report.leaked, 0);
}

// ── Selector determinism ──────────────────────────────────────────────────────

#[test]
fn every_selector_byte_picks_its_residue() {
    let names = ["zero", "one", "two"];
    let unit = default_harness(names.iter().map(|n| signature(n, "void", &[])).collect());
    let input: Vec<u8> = (0..=255u8).collect();

    let report = run_libfuzzer(&unit, &input).unwrap();

    assert_eq!(report.calls.len(), 256);
    for (b, observed) in report.calls.iter().enumerate() {
        assert_eq!(observed.symbol, names[b % names.len()], "selector {b}");
    }
}

#[test]
fn single_function_takes_every_selector() {
    let unit = default_harness(vec![signature("tick", "void", &[])]);
    let input = [0u8, 1, 7, 200, 255];

    let report = run_libfuzzer(&unit, &input).unwrap();

    assert_eq!(report.calls.len(), input.len());
}

// ── Starvation safety ─────────────────────────────────────────────────────────

#[test]
fn every_truncation_stays_in_bounds() {
    let signatures = vec![
        signature("beep", "void", &["int32_t"]),
        signature("f", "void", &["int32_t", "char*", "char const*"]),
    ];
    let mut payload = 3i32.to_le_bytes().to_vec();
    payload.extend(text(b"abc"));
    payload.extend(text(b"de"));
    let full = call(1, &payload);

    let empty = run_libfuzzer(&default_harness(signatures.clone()), &[]).unwrap();
    assert!(empty.calls.is_empty());

    // `Buf` is exactly as long as the chunk, so reading past the cut faults
    for cut in 1..full.len() {
        let unit = harness(signatures.clone(), sized(cut));
        let report = run_libfuzzer(&unit, &full[..cut])
            .unwrap_or_else(|fault| panic!("cut at {cut}: {fault}"));
        assert!(report.calls.is_empty(), "cut at {cut} still called");
        assert_eq!(report.leaked, 0, "cut at {cut} leaked");
    }
    let unit = harness(signatures, sized(full.len()));
    let report = run_libfuzzer(&unit, &full).unwrap();
    assert_eq!(report.calls.len(), 1);
}

fn sized(buffer_capacity: usize) -> HarnessConfig {
    HarnessConfig {
        buffer_capacity,
        ..HarnessConfig::default()
    }
}

#[test]
fn overlong_prefix_bails_before_allocating() {
    let unit = default_harness(vec![signature("greet", "void", &["char*"])]);
    let input = [0, 0xFF, 0, 0, 0, b'a'];

    let report = run_libfuzzer(&unit, &input).unwrap();

    assert!(report.calls.is_empty());
    assert_eq!(report.allocations, 0);
}

#[test]
fn prefix_larger_than_any_chunk_bails() {
    let unit = default_harness(vec![signature("greet", "void", &["char*"])]);
    let input = call(0, &u32::MAX.to_le_bytes());

    let report = run_libfuzzer(&unit, &input).unwrap();

    assert!(report.calls.is_empty());
    assert_eq!(report.allocations, 0);
}

#[test]
fn narrow_scalar_still_needs_four_bytes() {
    let unit = default_harness(vec![signature("tick", "void", &["char"])]);

    let short = run_libfuzzer(&unit, &[0, b'x', 0, 0]).unwrap();
    assert!(short.calls.is_empty());

    // one byte consumed, the leftover three cannot pay for another guard
    let enough = run_libfuzzer(&unit, &[0, b'x', 0, 0, 0]).unwrap();
    assert_eq!(only_args(&enough), vec![vec![Arg::Int(i64::from(b'x'))]]);
}

#[test]
fn bail_drops_rest_of_chunk() {
    let unit = default_harness(vec![
        signature("beep", "void", &["int32_t"]),
        signature("tick", "void", &[]),
    ]);
    // case 0 starves, so the trailing tick selector is never reached
    let input = [0u8, 1, 2];

    let report = run_libfuzzer(&unit, &input).unwrap();

    assert!(report.calls.is_empty());
}

// ── Resource handling ─────────────────────────────────────────────────────────

#[test]
fn malloc_failure_frees_earlier_buffers() {
    let unit = default_harness(vec![signature("pair", "void", &["char*", "char*"])]);
    let mut payload = text(b"left");
    payload.extend(text(b"right"));
    let options = SimOptions {
        malloc_limit: Some(1),
        ..SimOptions::default()
    };

    let report = run_libfuzzer_with(&unit, &call(0, &payload), options).unwrap();

    assert!(report.calls.is_empty());
    assert_eq!(report.allocations, 1);
    assert_eq!(report.leaked, 0);
}

#[test]
fn second_guard_frees_first_buffer() {
    let unit = default_harness(vec![signature("pair", "void", &["char*", "char*"])]);
    // second prefix claims more than remains
    let mut payload = text(b"left");
    payload.extend([9, 0, 0, 0, b'r']);

    let report = run_libfuzzer(&unit, &call(0, &payload)).unwrap();

    assert!(report.calls.is_empty());
    assert_eq!(report.allocations, 1);
    assert_eq!(report.leaked, 0);
}

#[test]
fn load_failure_returns_distinguished_code() {
    let unit = default_harness(vec![signature("beep", "void", &["int32_t"])]);
    let options = SimOptions {
        fail_load: true,
        ..SimOptions::default()
    };

    let report = run_libfuzzer_with(&unit, &call(0, &[1, 0, 0, 0]), options).unwrap();

    assert_eq!(report.status, -1);
    assert!(report.calls.is_empty());
    assert_eq!(report.loads, 0);
    assert!(
        report
            .output
            .iter()
            .any(|line| line == &format!("could not load {LIBRARY}")),
        "{:?}",
        report.output
    );
}

#[test]
fn library_loads_once_and_closes_at_exit() {
    let unit = default_harness(vec![signature("beep", "void", &["int32_t"])]);
    let mut machine = Machine::new(&unit, SimOptions::default()).unwrap();

    for value in 0..3i32 {
        let status = machine.fuzz_one(&call(0, &value.to_le_bytes())).unwrap();
        assert_eq!(status, 0);
    }
    assert_eq!(machine.calls().len(), 3);

    let report = machine.exit().unwrap();
    assert_eq!(report.loads, 1);
    assert_eq!(report.closes, 1);
    assert!(report.output.iter().any(|line| line.starts_with("loaded beep at ")));
}

// ── Configuration variants ────────────────────────────────────────────────────

fn config(loop_style: LoopStyle, input_source: InputSource, buffer_capacity: usize) -> HarnessConfig {
    HarnessConfig {
        buffer_capacity,
        loop_style,
        input_source,
    }
}

#[test]
fn all_variants_agree_on_one_chunk() {
    let signatures = || {
        vec![
            signature("beep", "void", &["int32_t"]),
            signature("greet", "int32_t", &["char const*"]),
        ]
    };
    let mut input = call(0, &11i32.to_le_bytes());
    input.extend(call(1, &text(b"hey")));

    let mut seen = Vec::new();
    for loop_style in [LoopStyle::DoWhile, LoopStyle::While] {
        for source in [InputSource::LibFuzzer, InputSource::Stdin] {
            let unit = harness(signatures(), config(loop_style, source, 512));
            let report = match source {
                InputSource::LibFuzzer => run_libfuzzer(&unit, &input),
                InputSource::Stdin => run_stdin(&unit, &input),
            }
            .unwrap_or_else(|fault| panic!("{loop_style:?}/{source:?}: {fault}"));
            assert_eq!(report.status, 0);
            assert_eq!(report.leaked, 0);
            seen.push(report.calls);
        }
    }
    assert!(seen.windows(2).all(|w| w[0] == w[1]), "{seen:?}");
    assert_eq!(seen[0].len(), 2);
}

#[test]
fn each_read_is_drained_separately() {
    // capacity 5 makes every read exactly one beep call
    let mut input = Vec::new();
    for value in [1i32, 2, 3] {
        input.extend(call(0, &value.to_le_bytes()));
    }
    for loop_style in [LoopStyle::DoWhile, LoopStyle::While] {
        for source in [InputSource::LibFuzzer, InputSource::Stdin] {
            let unit = harness(
                vec![signature("beep", "void", &["int32_t"])],
                config(loop_style, source, 5),
            );
            let report = match source {
                InputSource::LibFuzzer => run_libfuzzer(&unit, &input),
                InputSource::Stdin => run_stdin(&unit, &input),
            }
            .unwrap();
            assert_eq!(
                only_args(&report),
                vec![vec![Arg::Int(1)], vec![Arg::Int(2)], vec![Arg::Int(3)]],
                "{loop_style:?}/{source:?}"
            );
        }
    }
}

#[test]
fn call_split_across_reads_is_dropped() {
    // 8-byte reads cut the second call in half
    let unit = harness(
        vec![signature("beep", "void", &["int32_t"])],
        config(LoopStyle::DoWhile, InputSource::Stdin, 8),
    );
    let mut input = call(0, &1i32.to_le_bytes());
    input.extend(call(0, &2i32.to_le_bytes()));

    let report = run_stdin(&unit, &input).unwrap();

    assert_eq!(only_args(&report), vec![vec![Arg::Int(1)]]);
}

#[test]
fn stdin_load_failure_exits_with_code() {
    let unit = harness(
        vec![signature("beep", "void", &["int32_t"])],
        config(LoopStyle::While, InputSource::Stdin, 64),
    );
    let options = SimOptions {
        fail_load: true,
        ..SimOptions::default()
    };

    let report = run_stdin_with(&unit, &call(0, &[0; 4]), options).unwrap();

    assert_eq!(report.status, -1);
    assert!(report.calls.is_empty());
}
