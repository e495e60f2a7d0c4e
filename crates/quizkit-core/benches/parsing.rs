use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizkit_core::bank::parse_bank_str;
use quizkit_core::model::Difficulty;
use quizkit_core::supply::parse_generated_question;
use quizkit_core::traits::extract_json_payload;
use std::path::Path;

const QUESTION: &str = r#"{
  "question": "Which planet is known as the Red Planet?",
  "questionJapanese": "赤い惑星として知られているのはどの惑星ですか？",
  "options": ["Venus", "Mars", "Jupiter", "Saturn"],
  "answer": "Mars",
  "explanation": "Mars looks red because of iron oxide on its surface.",
  "explanationJapanese": "火星は表面の酸化鉄のために赤く見えます。",
  "vocabulary": [
    {"word": "planet", "meaning": "惑星"},
    {"word": "surface", "meaning": "表面"}
  ]
}"#;

fn bench_extract_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_json");

    let fenced = format!("Here is your question:\n\n```json\n{QUESTION}\n```\n");
    let truncated = format!("```json\n{QUESTION}");
    let chatty = format!("Sure! {QUESTION} Hope that helps.");

    group.bench_function("bare", |b| {
        b.iter(|| extract_json_payload(black_box(QUESTION)))
    });

    group.bench_function("fenced", |b| {
        b.iter(|| extract_json_payload(black_box(&fenced)))
    });

    group.bench_function("truncated_fence", |b| {
        b.iter(|| extract_json_payload(black_box(&truncated)))
    });

    group.bench_function("surrounding_prose", |b| {
        b.iter(|| extract_json_payload(black_box(&chatty)))
    });

    group.finish();
}

fn bench_question_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("question_parsing");

    let fenced = format!("```json\n{QUESTION}\n```");
    group.bench_function("generated", |b| {
        b.iter(|| parse_generated_question(black_box(&fenced), "Science", Difficulty::Easy))
    });

    let bank = generate_bank(200);
    group.bench_function("bank_200", |b| {
        b.iter(|| parse_bank_str(black_box(&bank), Path::new("questions_bench.json")))
    });

    group.finish();
}

fn generate_bank(n: usize) -> String {
    let entries: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"question": "Question {i}?", "options": ["a{i}", "b{i}", "c{i}", "d{i}"],
  "answer": "c{i}", "category": "Science", "difficulty": "Medium",
  "explanation": "Because {i}.", "vocabulary": [{{"word": "w{i}", "meaning": "m{i}"}}]}}"#
            )
        })
        .collect();
    format!("[{}]", entries.join(",\n"))
}

criterion_group!(benches, bench_extract_json, bench_question_parsing);
criterion_main!(benches);
