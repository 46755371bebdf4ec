//! Throughput benchmark over a mixed document.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn sample_document(repeats: usize) -> String {
    let chunk = "\
# Section heading

A paragraph with *emphasis*, **strong**, `code`, a [link](/url \"title\"),
an ![image](/img.png), an autolink <http://example.com/> and an
entity &amp; reference.

- first item
- second item
  - nested item

1. ordered
2. list

> A block quote with
> two lines.

```rust
fn main() {
    println!(\"hello\");
}
```

[ref]: /target \"referenced\"

Final paragraph with [ref] and a hard break.
Done.

";
    chunk.repeat(repeats)
}

fn bench_to_html(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_html");
    for repeats in [1usize, 16, 128] {
        let input = sample_document(repeats);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(repeats),
            &input,
            |b, input| b.iter(|| quillmark::to_html(black_box(input))),
        );
    }
    group.finish();
}

fn bench_phases(c: &mut Criterion) {
    let input = sample_document(32);
    c.bench_function("parse_only", |b| {
        b.iter(|| quillmark::parse(black_box(&input)))
    });
    let doc = quillmark::parse(&input);
    c.bench_function("render_only", |b| {
        b.iter(|| quillmark::render(black_box(&doc)))
    });
}

criterion_group!(benches, bench_to_html, bench_phases);
criterion_main!(benches);
