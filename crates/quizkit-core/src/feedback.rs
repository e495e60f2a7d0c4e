//! End-of-quiz feedback, generated remotely with a templated fallback.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::model::QuizQuestion;
use crate::results::{Feedback, SpecificFeedbackItem};
use crate::traits::{extract_json_payload, GenerateRequest, LlmProvider};

/// Produces feedback for a finished quiz. Never fails.
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    async fn feedback(&self, score: u32, total: u32, incorrect: &[QuizQuestion]) -> Feedback;
}

/// Feedback for a perfect score.
pub fn perfect_feedback(score: u32, total: u32) -> Feedback {
    Feedback {
        overall_feedback_english: format!(
            "Excellent work! You scored a perfect {score} out of {total}!"
        ),
        overall_feedback_japanese: format!("素晴らしい！{total}問中{score}問全問正解です！"),
        specifics: Vec::new(),
    }
}

/// Encouragement plus one generic review item per missed question.
pub fn fallback_feedback(score: u32, total: u32, incorrect: &[QuizQuestion]) -> Feedback {
    Feedback {
        overall_feedback_english: format!(
            "Great effort! You scored {score} out of {total}. Keep practicing!"
        ),
        overall_feedback_japanese: format!(
            "素晴らしい努力です！{total}問中{score}問正解しました。練習を続けましょう！"
        ),
        specifics: incorrect
            .iter()
            .map(|q| SpecificFeedbackItem {
                question: q.question.clone(),
                advice_english: "Review the explanation for this question to reinforce the concept."
                    .to_string(),
                advice_japanese: "この問題の解説を復習して、理解を深めましょう。".to_string(),
                key_vocabulary: q.vocabulary.clone(),
            })
            .collect(),
    }
}

pub fn feedback_prompt(score: u32, total: u32, incorrect: &[QuizQuestion]) -> String {
    let missed: Vec<_> = incorrect
        .iter()
        .map(|q| {
            json!({
                "question": q.question,
                "explanation": q.explanation,
                "vocabulary": q.vocabulary,
            })
        })
        .collect();
    format!(
        "A user scored {score} out of {total} on an English general knowledge quiz. \
         Here are the questions they answered incorrectly:\n{}\n\
         Please generate\n\
         1. An overall encouraging feedback message in English and Japanese based on their score.\n\
         2. For each incorrect question, a short advice in English and Japanese that clarifies the \
         explanation and reinforces the vocabulary. Make sure the 'question' field matches the input.\n\
         Respond ONLY with JSON of this shape: {{\"overallFeedbackEnglish\": string, \
         \"overallFeedbackJapanese\": string, \"specifics\": [{{\"question\": string, \
         \"adviceEnglish\": string, \"adviceJapanese\": string, \
         \"keyVocabulary\": [{{\"word\": string, \"meaning\": string}}]}}]}}",
        serde_json::Value::Array(missed)
    )
}

/// Feedback from an optional provider, falling back to templates.
pub struct FeedbackWriter {
    provider: Option<Arc<dyn LlmProvider>>,
    temperature: f64,
    max_tokens: u32,
}

impl FeedbackWriter {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            provider,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    /// Templates only.
    pub fn offline() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl FeedbackSource for FeedbackWriter {
    async fn feedback(&self, score: u32, total: u32, incorrect: &[QuizQuestion]) -> Feedback {
        if incorrect.is_empty() {
            return perfect_feedback(score, total);
        }
        let Some(provider) = &self.provider else {
            return fallback_feedback(score, total, incorrect);
        };

        let request = GenerateRequest {
            prompt: feedback_prompt(score, total, incorrect),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: Some(0.95),
            top_k: Some(40),
            json_output: true,
        };
        let decoded = match provider.generate(&request).await {
            Ok(response) => {
                serde_json::from_str::<Feedback>(extract_json_payload(&response.content))
                    .map_err(anyhow::Error::from)
            }
            Err(e) => Err(e),
        };
        decoded.unwrap_or_else(|e| {
            tracing::warn!("feedback generation failed, using template: {e:#}");
            fallback_feedback(score, total, incorrect)
        })
    }
}
