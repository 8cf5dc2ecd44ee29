use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tcxrs::xml::XmlDocument;

/// Decoding benchmarks over the integration-test fixtures, plus a synthetic
/// document built by repeating the first activity to scale the point count.

const WATERGROVE: &str = include_str!("../tests/fixtures/watergrove.tcx");

fn repeated_document(copies: usize) -> String {
    let start = WATERGROVE.find("<Activity ").unwrap();
    let end = WATERGROVE.find("</Activity>").unwrap() + "</Activity>".len();
    let activity = &WATERGROVE[start..end];

    format!(
        "{}{}{}",
        &WATERGROVE[..start],
        activity.repeat(copies),
        &WATERGROVE[end..]
    )
}

fn bench_tree_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("XML Tree Loading");
    group.throughput(Throughput::Bytes(WATERGROVE.len() as u64));
    group.bench_function("watergrove", |b| {
        b.iter(|| XmlDocument::load(black_box(WATERGROVE)).unwrap())
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("TCX Parse");

    for &copies in &[1, 10, 50] {
        let document = repeated_document(copies);

        group.throughput(Throughput::Elements((copies * 267) as u64));
        group.bench_with_input(BenchmarkId::new("activities", copies), &document, |b, document| {
            b.iter(|| tcxrs::parse(black_box(document)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tree_loading, bench_parse);
criterion_main!(benches);
