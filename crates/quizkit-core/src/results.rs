//! Quiz outcomes: results, literacy tiers, feedback, and weekly missions.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{QuizQuestion, VocabularyEntry};

/// Literacy tier derived from accuracy, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteracyLevel {
    Starter,
    Explorer,
    Insightful,
    Scholar,
}

impl LiteracyLevel {
    /// Tier for an accuracy in `[0, 1]`.
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 0.85 {
            LiteracyLevel::Scholar
        } else if accuracy >= 0.70 {
            LiteracyLevel::Insightful
        } else if accuracy >= 0.50 {
            LiteracyLevel::Explorer
        } else {
            LiteracyLevel::Starter
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LiteracyLevel::Starter => "Starter",
            LiteracyLevel::Explorer => "Explorer",
            LiteracyLevel::Insightful => "Insightful",
            LiteracyLevel::Scholar => "Scholar",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            LiteracyLevel::Starter => "Focus on fundamentals and vocabulary.",
            LiteracyLevel::Explorer => "Broaden categories and keep practicing.",
            LiteracyLevel::Insightful => "Great comprehension. Try harder sets.",
            LiteracyLevel::Scholar => "Elite accuracy. Challenge yourself further.",
        }
    }
}

/// `score / total`, clamped to `[0, 1]`; zero when `total` is zero.
pub fn accuracy(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (score as f64 / total as f64).clamp(0.0, 1.0)
}

/// A finished quiz, as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawResult")]
pub struct QuizResult {
    pub id: Uuid,
    pub score: u32,
    pub total_questions: u32,
    pub category: String,
    pub date: DateTime<Utc>,
    pub accuracy: f64,
    pub literacy_level: LiteracyLevel,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResult {
    #[serde(default)]
    id: Option<Uuid>,
    score: u32,
    total_questions: u32,
    category: String,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    literacy_level: Option<LiteracyLevel>,
}

impl From<RawResult> for QuizResult {
    fn from(raw: RawResult) -> Self {
        let accuracy = raw
            .accuracy
            .map(|a| a.clamp(0.0, 1.0))
            .unwrap_or_else(|| accuracy(raw.score, raw.total_questions));
        Self {
            id: raw.id.unwrap_or_else(Uuid::new_v4),
            score: raw.score,
            total_questions: raw.total_questions,
            category: raw.category,
            date: raw.date.unwrap_or_else(Utc::now),
            accuracy,
            literacy_level: raw
                .literacy_level
                .unwrap_or_else(|| LiteracyLevel::from_accuracy(accuracy)),
        }
    }
}

impl QuizResult {
    pub fn new(score: u32, total_questions: u32, category: impl Into<String>) -> Self {
        Self::at(score, total_questions, category, Utc::now())
    }

    pub fn at(
        score: u32,
        total_questions: u32,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        let accuracy = accuracy(score, total_questions);
        Self {
            id: Uuid::new_v4(),
            score,
            total_questions,
            category: category.into(),
            date,
            accuracy,
            literacy_level: LiteracyLevel::from_accuracy(accuracy),
        }
    }

    /// Whole-number percentage, truncated.
    pub fn percentage(&self) -> u32 {
        (self.accuracy * 100.0) as u32
    }
}

/// Headline for a results screen, from a truncated percentage.
pub fn performance_label(percentage: u32) -> &'static str {
    match percentage {
        100.. => "Outstanding streak",
        80..=99 => "Great performance",
        50..=79 => "Keep building momentum",
        _ => "Start with a steady pace",
    }
}

/// Vocabulary from the missed questions, deduplicated by word in first-seen order.
pub fn aggregated_vocabulary(incorrect: &[QuizQuestion]) -> Vec<VocabularyEntry> {
    let mut seen = HashSet::new();
    incorrect
        .iter()
        .flat_map(|q| q.vocabulary.iter())
        .filter(|entry| seen.insert(entry.word.clone()))
        .cloned()
        .collect()
}

/// Advice for one missed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificFeedbackItem {
    pub question: String,
    pub advice_english: String,
    pub advice_japanese: String,
    #[serde(default)]
    pub key_vocabulary: Vec<VocabularyEntry>,
}

/// Bilingual end-of-quiz feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub overall_feedback_english: String,
    pub overall_feedback_japanese: String,
    #[serde(default)]
    pub specifics: Vec<SpecificFeedbackItem>,
}

/// Progress towards "reach the target accuracy in N different categories".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMissionProgress {
    pub unique_categories_at_target: BTreeSet<String>,
    pub target_accuracy: f64,
    pub target_category_count: usize,
}

impl Default for WeeklyMissionProgress {
    fn default() -> Self {
        Self {
            unique_categories_at_target: BTreeSet::new(),
            target_accuracy: 0.8,
            target_category_count: 3,
        }
    }
}

impl WeeklyMissionProgress {
    pub fn completed(&self) -> bool {
        self.unique_categories_at_target.len() >= self.target_category_count
    }

    pub fn progress_ratio(&self) -> f64 {
        if self.target_category_count == 0 {
            return 1.0;
        }
        (self.unique_categories_at_target.len() as f64 / self.target_category_count as f64)
            .min(1.0)
    }

    pub fn updating(&self, result: &QuizResult) -> Self {
        let mut updated = self.clone();
        if result.accuracy >= self.target_accuracy {
            updated
                .unique_categories_at_target
                .insert(result.category.clone());
        }
        updated
    }

    /// Fold the results dated on or after `since`.
    pub fn from_results<'a>(
        results: impl IntoIterator<Item = &'a QuizResult>,
        since: DateTime<Utc>,
    ) -> Self {
        results
            .into_iter()
            .filter(|r| r.date >= since)
            .fold(Self::default(), |progress, r| progress.updating(r))
    }
}
