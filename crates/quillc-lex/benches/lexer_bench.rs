//! Lexer benchmarks.
//!
//! Run with: `cargo bench --package quillc-lex`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use quillc_lex::{tokenize, LangTerms};

fn token_count(source: &str, terms: &LangTerms) -> usize {
    tokenize(source, "bench.ql", terms).map(|t| t.len()).unwrap_or(0)
}

fn bench_lexer_statements(c: &mut Criterion) {
    let terms = LangTerms::new();
    let mut group = c.benchmark_group("lexer");

    let source = "uint32 total = 0; for (uint8 i = 1; i <= 100; i++) total += i;";
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("simple_declaration", |b| {
        b.iter(|| token_count(black_box("int8 count = 3 + 4 * 2;"), &terms))
    });

    group.bench_function("for_loop", |b| {
        b.iter(|| token_count(black_box(source), &terms))
    });

    group.finish();
}

fn bench_lexer_mixed(c: &mut Criterion) {
    let terms = LangTerms::new();
    let mut group = c.benchmark_group("lexer_mixed");

    let source = r#"
        int32 a = 0x7FFF;
        double ratio = 3.125;
        string greeting = "hello there";
        datetime when = "2024-02-29 12:30:45.500";
        bool ready = a > 100 && ratio < 4.0 ? true : false;
        /* block comment in the middle */
        while (ready) { a--; if (a == 0) break; } // trailing note
    "#;
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("mixed_literals", |b| {
        b.iter(|| token_count(black_box(source), &terms))
    });

    group.finish();
}

criterion_group!(benches, bench_lexer_statements, bench_lexer_mixed);
criterion_main!(benches);
