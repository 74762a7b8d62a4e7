use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ng_core::keyword::parse_keyword_strings;
use ng_core::{decide, Mode, RuleIndex};

fn build_index() -> RuleIndex {
    let mut allow = Vec::new();
    let mut deny = Vec::new();
    for i in 0..500 {
        deny.push(format!("site{i}.example"));
        deny.push(format!("*.cdn{i}.example/*"));
        allow.push(format!("site{i}.example/docs/*"));
        allow.push(format!("forum{i}.example/r/*/wiki/**/page"));
    }
    RuleIndex::from_raw(&allow, &deny)
}

fn bench_decide(c: &mut Criterion) {
    let index = build_index();
    let allow_keywords = parse_keyword_strings(&["homework", "docs"]);
    let deny_keywords = parse_keyword_strings(&["casino", "poker"]);
    let never = |_: &str| false;

    let urls = [
        "https://site250.example/docs/intro",
        "https://img.cdn42.example/a/b/c.png",
        "https://forum7.example/r/rust/wiki/a/b/c/page",
        "https://unrelated.org/some/long/path?query=1",
    ];

    for mode in [Mode::Blacklist, Mode::Combined] {
        c.bench_function(&format!("decide_{}", mode.as_str()), |b| {
            b.iter(|| {
                for url in &urls {
                    black_box(decide(
                        black_box(url),
                        &index,
                        &allow_keywords,
                        &deny_keywords,
                        mode,
                        &never,
                    ));
                }
            })
        });
    }
}

criterion_group!(benches, bench_decide);
criterion_main!(benches);
