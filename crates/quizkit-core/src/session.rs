//! Quiz session state machine.
//!
//! ```text
//!   Setup --start--> Playing --advance (last)/finish--> Finished
//!     ^                 |                                  |
//!     +----cancel-------+------------reset/play_again------+
//!   Setup/Finished --view_history--> History --back_to_setup--> Setup
//! ```
//!
//! Score and answer counters change only while Playing, and each question
//! is scored at most once.

use std::fmt;
use std::sync::Arc;

use crate::error::SessionError;
use crate::feedback::FeedbackSource;
use crate::history::HistoryStore;
use crate::model::{DifficultyChoice, QuizQuestion, VocabularyEntry, RANDOM_CATEGORY};
use crate::results::{aggregated_vocabulary, performance_label, Feedback, QuizResult};
use crate::supply::QuestionSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Setup,
    Playing,
    Finished,
    History,
}

impl GameState {
    fn name(&self) -> &'static str {
        match self {
            GameState::Setup => "in setup",
            GameState::Playing => "playing",
            GameState::Finished => "finished",
            GameState::History => "viewing history",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Choices made on the setup screen.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSettings {
    pub count: usize,
    pub category: String,
    pub difficulty: DifficultyChoice,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            count: 5,
            category: RANDOM_CATEGORY.to_string(),
            difficulty: DifficultyChoice::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// The current question already had an answer; nothing changed.
    AlreadyAnswered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the question at this index.
    Next(usize),
    Finished,
}

pub struct QuizSession {
    source: Arc<dyn QuestionSource>,
    coach: Arc<dyn FeedbackSource>,
    history: HistoryStore,
    state: GameState,
    settings: QuizSettings,
    questions: Vec<QuizQuestion>,
    incorrect: Vec<QuizQuestion>,
    current_index: usize,
    selected_answer: Option<String>,
    correct_count: u32,
    total_count: u32,
    feedback: Option<Feedback>,
    last_result: Option<QuizResult>,
    error_message: Option<String>,
}

impl QuizSession {
    pub fn new(
        source: Arc<dyn QuestionSource>,
        coach: Arc<dyn FeedbackSource>,
        history: HistoryStore,
    ) -> Self {
        Self {
            source,
            coach,
            history,
            state: GameState::Setup,
            settings: QuizSettings::default(),
            questions: Vec::new(),
            incorrect: Vec::new(),
            current_index: 0,
            selected_answer: None,
            correct_count: 0,
            total_count: 0,
            feedback: None,
            last_result: None,
            error_message: None,
        }
    }

    /// Fetch questions and begin playing. On failure the session stays in
    /// Setup with `error_message` set.
    pub async fn start(&mut self, settings: QuizSettings) -> Result<(), SessionError> {
        self.require(GameState::Setup, "start a quiz")?;
        self.clear_round();
        self.settings = settings;

        let fetched = self
            .source
            .questions(
                self.settings.count,
                &self.settings.category,
                self.settings.difficulty,
            )
            .await;

        let error = match fetched {
            Ok(questions) if !questions.is_empty() => {
                tracing::info!(
                    "starting quiz: {} questions, {} / {}",
                    questions.len(),
                    self.settings.category,
                    self.settings.difficulty
                );
                self.questions = questions;
                self.state = GameState::Playing;
                return Ok(());
            }
            Ok(_) => SessionError::NoQuestions {
                category: self.settings.category.clone(),
                difficulty: self.settings.difficulty.to_string(),
            },
            Err(e) => SessionError::Supply(format!("{e:#}")),
        };
        tracing::warn!("quiz did not start: {error}");
        self.error_message = Some(error.to_string());
        self.state = GameState::Setup;
        Err(error)
    }

    /// Answer the current question. Repeated answers are ignored.
    pub fn select_answer(&mut self, answer: &str) -> Result<AnswerOutcome, SessionError> {
        self.require(GameState::Playing, "answer")?;
        if self.selected_answer.is_some() {
            return Ok(AnswerOutcome::AlreadyAnswered);
        }
        let Some(current) = self.questions.get(self.current_index) else {
            return Ok(AnswerOutcome::AlreadyAnswered);
        };
        if !current.options().iter().any(|o| o == answer) {
            return Err(SessionError::UnknownOption(answer.to_string()));
        }

        let correct = current.is_correct(answer);
        if !correct {
            self.incorrect.push(current.clone());
        }
        self.selected_answer = Some(answer.to_string());
        self.total_count += 1;
        if correct {
            self.correct_count += 1;
            Ok(AnswerOutcome::Correct)
        } else {
            Ok(AnswerOutcome::Incorrect)
        }
    }

    /// Answer by zero-based option index.
    pub fn select_option(&mut self, index: usize) -> Result<AnswerOutcome, SessionError> {
        self.require(GameState::Playing, "answer")?;
        let option = self
            .current_question()
            .and_then(|q| q.options().get(index))
            .cloned()
            .ok_or_else(|| SessionError::UnknownOption(format!("option #{}", index + 1)))?;
        self.select_answer(&option)
    }

    /// Move to the next question, finishing after the last one.
    pub async fn advance(&mut self) -> Result<Advance, SessionError> {
        self.require(GameState::Playing, "advance")?;
        self.selected_answer = None;
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            Ok(Advance::Next(self.current_index))
        } else {
            self.finish().await?;
            Ok(Advance::Finished)
        }
    }

    /// Record the result, compute feedback, and move to Finished.
    pub async fn finish(&mut self) -> Result<&QuizResult, SessionError> {
        self.require(GameState::Playing, "finish")?;
        let result = QuizResult::new(
            self.correct_count,
            self.questions.len() as u32,
            self.settings.category.clone(),
        );
        if let Err(e) = self.history.record(result.clone()) {
            tracing::warn!("failed to save quiz history: {e:#}");
        }

        // Feedback only makes sense once every question has an answer.
        self.feedback = if self.total_count as usize == self.questions.len() {
            Some(
                self.coach
                    .feedback(self.correct_count, self.total_count, &self.incorrect)
                    .await,
            )
        } else {
            None
        };

        self.state = GameState::Finished;
        Ok(self.last_result.insert(result))
    }

    /// Abandon a quiz in progress. Ignored outside Playing.
    pub fn cancel(&mut self) {
        if self.state == GameState::Playing {
            self.reset();
        }
    }

    /// Back to a clean Setup from any state.
    pub fn reset(&mut self) {
        self.clear_round();
        self.state = GameState::Setup;
    }

    pub fn play_again(&mut self) {
        self.reset();
    }

    pub fn view_history(&mut self) -> Result<(), SessionError> {
        if self.state == GameState::Playing {
            return Err(SessionError::InvalidTransition {
                action: "view history",
                state: self.state.name(),
            });
        }
        self.state = GameState::History;
        Ok(())
    }

    pub fn back_to_setup(&mut self) -> Result<(), SessionError> {
        self.require(GameState::History, "return to setup")?;
        self.state = GameState::Setup;
        Ok(())
    }

    pub fn clear_history(&mut self) -> anyhow::Result<()> {
        self.history.clear()
    }

    fn require(&self, expected: GameState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.state.name(),
            })
        }
    }

    fn clear_round(&mut self) {
        self.questions.clear();
        self.incorrect.clear();
        self.current_index = 0;
        self.selected_answer = None;
        self.correct_count = 0;
        self.total_count = 0;
        self.feedback = None;
        self.error_message = None;
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn incorrect_answers(&self) -> &[QuizQuestion] {
        &self.incorrect
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn last_result(&self) -> Option<&QuizResult> {
        self.last_result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn history(&self) -> &[QuizResult] {
        self.history.results()
    }

    pub fn is_last_question(&self) -> bool {
        !self.questions.is_empty() && self.current_index + 1 >= self.questions.len()
    }

    /// Fraction of the quiz reached, counting the current question.
    pub fn progress(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.current_index + 1) as f64 / self.questions.len() as f64
    }

    /// Results-screen headline for the last finished quiz.
    pub fn performance_label(&self) -> Option<&'static str> {
        self.last_result
            .as_ref()
            .map(|r| performance_label(r.percentage()))
    }

    /// Vocabulary to review from this round's missed questions.
    pub fn review_vocabulary(&self) -> Vec<VocabularyEntry> {
        aggregated_vocabulary(&self.incorrect)
    }
}
