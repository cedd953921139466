use criterion::{Criterion, criterion_group, criterion_main};
use marginalia_engine::annotate::{PaintSpan, SpanKind, apply_overlay};
use marginalia_engine::render::render_markdown;
use marginalia_engine::store::SpanId;
use std::hint::black_box;
mod common;

fn spans_of(text_len: usize, count: usize, kind: SpanKind) -> Vec<PaintSpan> {
    common::generate_spans(text_len, count, 12)
        .into_iter()
        .map(|(start, end)| PaintSpan {
            id: SpanId::new(),
            kind,
            range: start..end,
        })
        .collect()
}

fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay");
    group.sample_size(20);

    let content = common::generate_article(100);
    let tree = render_markdown(&content);
    let text_len = tree.text_len();

    for span_count in [10usize, 100] {
        let highlights = spans_of(text_len, span_count, SpanKind::Highlight);
        group.bench_function(format!("paint_{span_count}_highlights"), |b| {
            b.iter(|| {
                let mut tree = tree.clone();
                let report = apply_overlay(black_box(&mut tree), &[], black_box(&highlights));
                black_box(report);
            });
        });
    }

    // Repaint path: the tree already carries markers, so the pass also
    // pays for reset and renormalization.
    let annotations = spans_of(text_len, 50, SpanKind::Annotation);
    let mut painted = tree.clone();
    apply_overlay(&mut painted, &annotations, &[]);
    group.bench_function("repaint_50_annotations", |b| {
        b.iter(|| {
            let report = apply_overlay(black_box(&mut painted), &annotations, &[]);
            black_box(report);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_overlay);
criterion_main!(benches);
