//! Core question model.
//!
//! A `QuizQuestion` can only be built through [`QuizQuestion::new`] or by
//! deserialization, both of which check that the answer is one of the
//! options. `options` and `answer` are private for that reason.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// The category name meaning "any category".
pub const RANDOM_CATEGORY: &str = "Random";

/// Categories offered by the setup screen.
pub const CATEGORIES: &[&str] = &[
    "Random",
    "History",
    "Science",
    "Geography",
    "Technology",
    "Pop Culture",
    "Sports",
    "Nature & Animals",
];

/// Whether `category` stands for "any category".
pub fn is_random_category(category: &str) -> bool {
    category.eq_ignore_ascii_case(RANDOM_CATEGORY)
}

/// The offered category matching `name`, ignoring case.
pub fn canonical_category(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CATEGORIES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(name))
}

/// Question difficulty.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ModelError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Difficulty as chosen at setup: a fixed level, or a mix of all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifficultyChoice {
    Level(Difficulty),
    Random,
}

impl DifficultyChoice {
    pub fn label(&self) -> &'static str {
        match self {
            DifficultyChoice::Level(d) => d.as_str(),
            DifficultyChoice::Random => "Random",
        }
    }

    /// Whether a question of `difficulty` satisfies this choice.
    pub fn accepts(&self, difficulty: Difficulty) -> bool {
        match self {
            DifficultyChoice::Level(d) => *d == difficulty,
            DifficultyChoice::Random => true,
        }
    }
}

impl Default for DifficultyChoice {
    fn default() -> Self {
        DifficultyChoice::Level(Difficulty::Medium)
    }
}

impl From<Difficulty> for DifficultyChoice {
    fn from(d: Difficulty) -> Self {
        DifficultyChoice::Level(d)
    }
}

impl fmt::Display for DifficultyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DifficultyChoice {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("random") {
            Ok(DifficultyChoice::Random)
        } else {
            s.parse().map(DifficultyChoice::Level)
        }
    }
}

/// A vocabulary word highlighted alongside a question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub word: String,
    /// Japanese meaning.
    pub meaning: String,
    #[serde(default = "default_part_of_speech")]
    pub part_of_speech: String,
    #[serde(default)]
    pub example: String,
}

impl VocabularyEntry {
    pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            meaning: meaning.into(),
            part_of_speech: default_part_of_speech(),
            example: String::new(),
        }
    }
}

fn default_part_of_speech() -> String {
    "general".to_string()
}

/// A bilingual multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawQuestion")]
pub struct QuizQuestion {
    pub id: Uuid,
    pub category: String,
    pub difficulty: Difficulty,
    pub question: String,
    pub question_japanese: String,
    options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_japanese: Option<Vec<String>>,
    answer: String,
    pub explanation: String,
    pub explanation_japanese: String,
    pub vocabulary: Vec<VocabularyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_insight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub english_expression: Option<String>,
}

/// Wire shape accepted on deserialization, before the invariants are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawQuestion {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    question: String,
    question_japanese: String,
    options: Vec<String>,
    #[serde(default)]
    options_japanese: Option<Vec<String>>,
    answer: String,
    explanation: String,
    explanation_japanese: String,
    #[serde(default)]
    vocabulary: Vec<VocabularyEntry>,
    #[serde(default)]
    knowledge_insight: Option<String>,
    #[serde(default)]
    english_expression: Option<String>,
}

impl TryFrom<RawQuestion> for QuizQuestion {
    type Error = ModelError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let difficulty = match raw.difficulty {
            Some(d) => d.parse()?,
            None => Difficulty::default(),
        };
        let mut question = QuizQuestion::new(raw.question, raw.options, raw.answer)?;
        question.id = raw.id.unwrap_or_else(Uuid::new_v4);
        question.category = raw
            .category
            .unwrap_or_else(|| RANDOM_CATEGORY.to_string());
        question.difficulty = difficulty;
        question.question_japanese = raw.question_japanese;
        question.options_japanese = raw.options_japanese;
        question.explanation = raw.explanation;
        question.explanation_japanese = raw.explanation_japanese;
        question.vocabulary = raw.vocabulary;
        question.knowledge_insight = raw.knowledge_insight.filter(|s| !s.is_empty());
        question.english_expression = raw.english_expression.filter(|s| !s.is_empty());
        Ok(question)
    }
}

impl QuizQuestion {
    /// Build a question, checking that `answer` is one of `options`.
    ///
    /// Everything else starts empty (category "Random", difficulty Medium).
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let answer = answer.into();
        if options.is_empty() {
            return Err(ModelError::NoOptions);
        }
        if !options.contains(&answer) {
            return Err(ModelError::AnswerNotInOptions { answer });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            category: RANDOM_CATEGORY.to_string(),
            difficulty: Difficulty::default(),
            question: question.into(),
            question_japanese: String::new(),
            options,
            options_japanese: None,
            answer,
            explanation: String::new(),
            explanation_japanese: String::new(),
            vocabulary: Vec::new(),
            knowledge_insight: None,
            english_expression: None,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn is_correct(&self, choice: &str) -> bool {
        self.answer == choice
    }

    /// The stored insight, or a sentence tying the answer to the question.
    pub fn knowledge_insight(&self) -> String {
        if let Some(insight) = &self.knowledge_insight {
            return insight.clone();
        }
        let trimmed = self
            .question
            .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
        format!(
            "Remember that {} answers \"{}\" - that link helps you retain both the fact and why it matters.",
            self.answer, trimmed
        )
    }

    /// The stored expression, or a sentence naming the other options as decoys.
    pub fn english_expression(&self) -> String {
        if let Some(expression) = &self.english_expression {
            return expression.clone();
        }
        let decoys: Vec<&str> = self
            .options
            .iter()
            .filter(|o| **o != self.answer)
            .map(String::as_str)
            .collect();
        if decoys.is_empty() {
            return "Try turning the explanation into a sentence you can say aloud.".to_string();
        }
        format!(
            "The other choices ({}) are decoys, so keep {} in mind whenever you see \"{}\".",
            human_readable_list(&decoys),
            self.answer,
            self.question.trim()
        )
    }
}

/// Joins items as "A", "A and B", or "A, B, and C".
pub fn human_readable_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [a, b] => format!("{a} and {b}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}
