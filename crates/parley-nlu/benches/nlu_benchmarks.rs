//! Benchmarks for the per-turn NLU hot path: rule analysis, gazetteer
//! extraction and entity merging.

use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use parley_core::text::char_len;
use parley_core::Language;
use parley_nlu::{merge_entities, EntityModel, GazetteerModel, LinguisticAnalyzer};

const UTTERANCES: &[(&str, &str)] = &[
    ("es", "¿Qué tiempo hace en Madrid?"),
    ("es", "recuérdame comprar pan el 3 de mayo a las 5 de la tarde"),
    ("es", "dime el clima en Ciudad de Panamá pasado mañana"),
    ("en", "remind me to call Ana tomorrow at 7:30 pm"),
    ("en", "what is the weather in New York on Friday"),
];

fn bench_analyze(c: &mut Criterion) {
    let analyzer = LinguisticAnalyzer::new();
    let reference = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
    let inputs: Vec<(Language, &str)> = UTTERANCES
        .iter()
        .map(|(code, text)| (Language::new(code).unwrap(), *text))
        .collect();

    c.bench_function("analyze_utterances", |b| {
        b.iter(|| {
            for (lang, text) in &inputs {
                black_box(analyzer.analyze(black_box(text), lang, reference));
            }
        })
    });
}

fn bench_extract_and_merge(c: &mut Criterion) {
    let analyzer = LinguisticAnalyzer::new();
    let reference = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
    let models = [
        GazetteerModel::builtin(Language::es()),
        GazetteerModel::builtin(Language::en()),
    ];

    c.bench_function("extract_and_merge", |b| {
        b.iter(|| {
            for (code, text) in UTTERANCES {
                let lang = Language::new(code).unwrap();
                let model = if lang == Language::es() { &models[0] } else { &models[1] };
                let rule = analyzer.analyze(text, &lang, reference).entities;
                let stat = model.extract(text);
                black_box(merge_entities(rule, stat, char_len(text)));
            }
        })
    });
}

criterion_group!(benches, bench_analyze, bench_extract_and_merge);
criterion_main!(benches);
