//! Chapter quizzes: question bank and a running quiz session.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::ChapterId;
use crate::constants::{MAX_STARS, QUIZ_QUESTIONS};
use crate::error::EngineError;

const DEFAULT_QUIZ_DATA: &str = include_str!("../../data/quizzes.json");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizBankError {
    #[error("chapter {chapter} has {count} questions, expected {expected}")]
    WrongQuestionCount {
        chapter: ChapterId,
        count: usize,
        expected: usize,
    },
    #[error(
        "chapter {chapter} question {question} answer {answer} is not one of {options} options"
    )]
    AnswerOutOfRange {
        chapter: ChapterId,
        question: usize,
        answer: usize,
        options: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub answer: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizBank {
    chapters: BTreeMap<ChapterId, Vec<QuizQuestion>>,
}

impl QuizBank {
    /// Questions shipped with the crate.
    #[must_use]
    pub fn default_bank() -> Self {
        Self::from_json(DEFAULT_QUIZ_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn questions(&self, chapter: ChapterId) -> &[QuizQuestion] {
        self.chapters.get(&chapter).map_or(&[], Vec::as_slice)
    }

    /// Every chapter must carry exactly three answerable questions.
    ///
    /// # Errors
    ///
    /// Returns the first chapter that breaks the shape.
    pub fn validate(&self) -> Result<(), QuizBankError> {
        for chapter in ChapterId::ALL {
            let questions = self.questions(chapter);
            if questions.len() != QUIZ_QUESTIONS {
                return Err(QuizBankError::WrongQuestionCount {
                    chapter,
                    count: questions.len(),
                    expected: QUIZ_QUESTIONS,
                });
            }
            for (question, q) in questions.iter().enumerate() {
                if q.answer >= q.options.len() {
                    return Err(QuizBankError::AnswerOutOfRange {
                        chapter,
                        question,
                        answer: q.answer,
                        options: q.options.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Score of a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub chapter: ChapterId,
    pub correct: u8,
    pub stars: u8,
}

/// Feedback after one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizStep {
    Next { correct: bool, next_index: usize },
    Finished { correct: bool, result: QuizResult },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    chapter: ChapterId,
    questions: Vec<QuizQuestion>,
    index: usize,
    correct: u8,
}

impl QuizSession {
    #[must_use]
    pub fn new(chapter: ChapterId, questions: &[QuizQuestion]) -> Self {
        Self {
            chapter,
            questions: questions.iter().take(QUIZ_QUESTIONS).cloned().collect(),
            index: 0,
            correct: 0,
        }
    }

    #[must_use]
    pub const fn chapter(&self) -> ChapterId {
        self.chapter
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.index)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index >= self.questions.len()
    }

    /// # Errors
    ///
    /// Returns `InvalidOption` when `option` is not a listed answer, or
    /// `InvalidStateTransition` once every question is answered.
    pub fn answer(&mut self, option: usize) -> Result<QuizStep, EngineError> {
        let Some(question) = self.questions.get(self.index) else {
            return Err(EngineError::transition(
                "quiz finished",
                "answer a question",
            ));
        };
        if option >= question.options.len() {
            return Err(EngineError::InvalidOption {
                index: option,
                options: question.options.len(),
            });
        }
        let correct = option == question.answer;
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
        self.index += 1;
        if self.is_finished() {
            Ok(QuizStep::Finished {
                correct,
                result: QuizResult {
                    chapter: self.chapter,
                    correct: self.correct,
                    stars: self.correct.min(MAX_STARS),
                },
            })
        } else {
            Ok(QuizStep::Next {
                correct,
                next_index: self.index,
            })
        }
    }
}
