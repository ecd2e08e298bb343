use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fuzzit_compiler::{HarnessConfig, HarnessSpec, build_unit, render_harness};
use fuzzit_extract::{ManifestProvider, SignatureExtractor};
use fuzzit_tests::signature;
use fuzzit_types::FunctionSignature;

const SHAPES: [&[&str]; 4] = [
    &["int32_t"],
    &["char const*"],
    &["char", "uint16_t", "int64_t"],
    &["int32_t", "char*", "uint8_t*"],
];

fn exports(count: usize) -> Vec<FunctionSignature> {
    (0..count)
        .map(|i| signature(&format!("export_{i}"), "int32_t", SHAPES[i % SHAPES.len()]))
        .collect()
}

fn manifest(count: usize) -> ManifestProvider {
    (0..count).fold(ManifestProvider::new("libbench.so"), |m, i| {
        m.function(&format!("export_{i}"), "int32_t", SHAPES[i % SHAPES.len()])
    })
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_harness");
    for count in [1usize, 16, 256, 2048] {
        let spec = HarnessSpec::new("libbench.so", exports(count), HarnessConfig::default())
            .unwrap();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &spec, |b, spec| {
            b.iter(|| render_harness(spec).unwrap());
        });
    }
    group.finish();
}

fn bench_lower_only(c: &mut Criterion) {
    let spec = HarnessSpec::new("libbench.so", exports(256), HarnessConfig::default()).unwrap();
    c.bench_function("build_unit_256", |b| {
        b.iter(|| build_unit(&spec).unwrap());
    });
}

fn bench_extract(c: &mut Criterion) {
    let provider = manifest(2048);
    let extractor = SignatureExtractor::default();
    c.bench_function("extract_2048", |b| {
        b.iter(|| extractor.extract(&provider).unwrap());
    });
}

criterion_group!(benches, bench_render, bench_lower_only, bench_extract);
criterion_main!(benches);
