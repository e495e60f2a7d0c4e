//! The `quizkit play` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use quizkit_core::feedback::FeedbackWriter;
use quizkit_core::history::HistoryStore;
use quizkit_core::model::QuizQuestion;
use quizkit_core::session::{Advance, AnswerOutcome, QuizSession};
use quizkit_providers::config::load_config_from;

use super::{build_supply, parse_category, parse_difficulty};

pub async fn execute(
    count: Option<usize>,
    category: Option<String>,
    difficulty: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let mut settings = config.default_settings()?;
    if let Some(count) = count {
        settings.count = count;
    }
    if let Some(category) = category {
        settings.category = parse_category(&category)?;
    }
    if let Some(difficulty) = difficulty {
        settings.difficulty = parse_difficulty(&difficulty)?;
    }
    anyhow::ensure!(settings.count >= 1, "count must be at least 1");

    let provider = config.provider()?;
    if provider.is_none() {
        tracing::info!("no generation provider configured, using bundled questions");
    }
    let supply = build_supply(&config, provider.clone())?;
    let coach = FeedbackWriter::new(provider);
    let history = HistoryStore::load(config.history_path());
    let mut session = QuizSession::new(Arc::new(supply), Arc::new(coach), history);

    println!(
        "Preparing {} question(s): {} / {}...",
        settings.count, settings.category, settings.difficulty
    );
    session.start(settings).await?;

    loop {
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        print_question(&session, &question);

        let Some(choice) = read_choice(&mut std::io::stdin().lock(), question.options().len())? else {
            session.cancel();
            println!("\nQuiz abandoned.");
            return Ok(());
        };

        match session.select_option(choice)? {
            AnswerOutcome::Correct => println!("\nCorrect!"),
            AnswerOutcome::Incorrect => {
                println!("\nIncorrect. The answer is: {}", question.answer())
            }
            AnswerOutcome::AlreadyAnswered => {}
        }
        print_explanation(&question);

        if session.advance().await? == Advance::Finished {
            break;
        }
    }

    print_results(&session);
    Ok(())
}

fn print_question(session: &QuizSession, question: &QuizQuestion) {
    println!(
        "\nQuestion {}/{} [{} / {}]",
        session.current_index() + 1,
        session.questions().len(),
        question.category,
        question.difficulty
    );
    println!("{}", question.question);
    if !question.question_japanese.is_empty() {
        println!("{}", question.question_japanese);
    }
    let japanese = question.options_japanese.as_deref().unwrap_or_default();
    for (i, option) in question.options().iter().enumerate() {
        match japanese.get(i) {
            Some(ja) => println!("  {}. {option} ({ja})", i + 1),
            None => println!("  {}. {option}", i + 1),
        }
    }
}

/// Read a 1-based option number. `None` on end of input or `q`.
fn read_choice(input: &mut impl BufRead, options: usize) -> Result<Option<usize>> {
    loop {
        print!("Your answer (1-{options}, q to quit): ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read answer")? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => return Ok(Some(n - 1)),
            _ => println!("Please enter a number between 1 and {options}."),
        }
    }
}

fn print_explanation(question: &QuizQuestion) {
    println!("{}", question.explanation);
    if !question.explanation_japanese.is_empty() {
        println!("{}", question.explanation_japanese);
    }
    if !question.vocabulary.is_empty() {
        println!("Vocabulary:");
        for entry in &question.vocabulary {
            println!("  {} - {}", entry.word, entry.meaning);
        }
    }
    println!("Did you know? {}", question.knowledge_insight());
    println!("Expression: {}", question.english_expression());
}

fn print_results(session: &QuizSession) {
    let Some(result) = session.last_result() else {
        return;
    };
    println!("\n=== Results ===");
    println!(
        "Score: {}/{} ({}%)",
        result.score,
        result.total_questions,
        result.percentage()
    );
    if let Some(label) = session.performance_label() {
        println!("{label}");
    }
    println!(
        "Literacy level: {} - {}",
        result.literacy_level.title(),
        result.literacy_level.hint()
    );

    if let Some(feedback) = session.feedback() {
        println!("\n{}", feedback.overall_feedback_english);
        println!("{}", feedback.overall_feedback_japanese);
        for item in &feedback.specifics {
            println!("\n- {}", item.question);
            println!("  {}", item.advice_english);
            println!("  {}", item.advice_japanese);
        }
    }

    let review = session.review_vocabulary();
    if !review.is_empty() {
        println!("\nWords to review:");
        for entry in review {
            println!("  {} - {}", entry.word, entry.meaning);
        }
    }
}
