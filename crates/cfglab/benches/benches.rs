use std::{env, path::PathBuf};

use cfglab::{cyk::ParseForest, slr::SlrParser, source::read_grammar, Grammar};
use criterion::{criterion_group, criterion_main, Criterion};

criterion_main!(benches);
criterion_group!(benches, bench_arithmetic, bench_dangling_else);

fn bench_arithmetic(c: &mut Criterion) {
    let grammar = load("arithmetic");
    bench_tables(c, "arithmetic", &grammar);

    let tokens: Vec<&str> = ["(", "id", "+", "id", ")", "*", "id", "+", "id"]
        .iter()
        .copied()
        .cycle()
        .take(9 * 4)
        .collect();
    let binary = grammar.to_binary_form().unwrap();
    c.bench_function("arithmetic/CYK", |b| {
        b.iter(|| ParseForest::build(&binary, &tokens).unwrap().accepts());
    });
}

fn bench_dangling_else(c: &mut Criterion) {
    let grammar = load("dangling_else");
    bench_tables(c, "dangling_else", &grammar);

    let mut tokens = vec!["if"; 8];
    tokens.push("x");
    for _ in 0..4 {
        tokens.extend(["else", "x"]);
    }
    let binary = grammar.to_binary_form().unwrap();
    c.bench_function("dangling_else/CYK trees", |b| {
        b.iter(|| ParseForest::build(&binary, &tokens).unwrap().analyze());
    });
}

fn load(grammar_name: &str) -> Grammar {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    read_grammar(project_root.join(format!("tests/{}.json", grammar_name))).unwrap()
}

fn bench_tables(c: &mut Criterion, grammar_name: &str, grammar: &Grammar) {
    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("FIRST/FOLLOW", |b| {
        b.iter(|| {
            let mut grammar = grammar.clone();
            grammar.invalidate_caches();
            let nullable = grammar.derivation_sets().map(|sets| sets.is_nullable("S"));
            nullable.unwrap()
        });
    });
    group.bench_function("LL(1)", |b| {
        b.iter(|| grammar.build_ll1_table().unwrap());
    });
    group.bench_function("SLR", |b| {
        b.iter(|| SlrParser::build(&mut grammar.clone()).unwrap());
    });
    group.finish();
}
