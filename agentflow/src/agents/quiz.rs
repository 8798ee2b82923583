//! Quiz generation from the inbound paragraph.

use crate::context::{keys, StageContext};
use crate::core::StageResult;
use crate::errors::ConfigError;
use crate::stages::{owned, Stage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Allowed number of questions per quiz.
pub const QUIZ_QUESTION_RANGE: RangeInclusive<usize> = 1..=10;

const DISTRACTORS: [&str; 3] = ["Unrelated concept", "Opposite meaning", "None of the above"];
const PREVIEW_CHARS: usize = 50;

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// The question text.
    pub question: String,
    /// Answer options; the first is the correct one.
    pub options: Vec<String>,
    /// The correct answer.
    pub answer: String,
}

/// A generated quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// The questions, one per sentence.
    pub questions: Vec<QuizQuestion>,
    /// Always `"success"`.
    pub status: String,
}

/// Builds up to `num_questions` questions, one per sentence of `paragraph`.
#[must_use]
pub fn generate_quiz(paragraph: &str, num_questions: usize) -> Quiz {
    let questions = paragraph
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(num_questions)
        .map(|sentence| {
            let preview: String = sentence.chars().take(PREVIEW_CHARS).collect();
            let mut options = vec![sentence.to_string()];
            options.extend(DISTRACTORS.iter().map(|d| (*d).to_string()));

            QuizQuestion {
                question: format!("What is the main idea of: '{preview}...?'"),
                options,
                answer: sentence.to_string(),
            }
        })
        .collect();

    Quiz {
        questions,
        status: "success".to_string(),
    }
}

/// Writes a quiz over `input_text` to `quiz`.
#[derive(Debug)]
pub struct QuizGeneratorAgent {
    num_questions: usize,
    owned_keys: BTreeSet<String>,
}

impl QuizGeneratorAgent {
    /// Creates the agent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `num_questions` is outside 1..=10.
    pub fn new(num_questions: usize) -> Result<Self, ConfigError> {
        if !QUIZ_QUESTION_RANGE.contains(&num_questions) {
            return Err(ConfigError::invalid(
                "quiz_questions",
                format!("must be between 1 and 10, got {num_questions}"),
            ));
        }
        Ok(Self {
            num_questions,
            owned_keys: owned([keys::QUIZ]),
        })
    }
}

#[async_trait]
impl Stage for QuizGeneratorAgent {
    fn name(&self) -> &str {
        super::QUIZ_GENERATOR
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let paragraph = ctx.get_str(keys::INPUT_TEXT).unwrap_or_default();
        let quiz = generate_quiz(paragraph, self.num_questions);

        match serde_json::to_value(quiz) {
            Ok(value) => StageResult::value(keys::QUIZ, value),
            Err(err) => StageResult::fail(format!("failed to encode quiz: {err}")),
        }
    }
}
