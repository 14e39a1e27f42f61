use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::validation::{max_length, required, Validate, ValidationErrors};
use crate::database::models::{Attachment, QuestionAnswer};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AnswerForCreation {
    pub answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct QuizForCreation {
    pub course_id: i64,
    pub question: String,
    pub answers: Vec<AnswerForCreation>,
}

impl Validate for QuizForCreation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.course_id <= 0 {
            errors.add("course_id", "Value must not be null or empty!");
        }
        errors.check("question", required(&self.question));
        errors.check("question", max_length(&self.question, 1000));
        if self.answers.len() < 2 {
            errors.add("answers", "A quiz needs at least two answers");
        } else if self.answers.iter().any(|a| a.answer.trim().is_empty()) {
            errors.add("answers", "Answers must not be empty");
        } else if self.answers.iter().filter(|a| a.is_correct).count() != 1 {
            errors.add("answers", "Exactly one answer must be correct");
        }
        errors.into_result()
    }
}

/// An answer option as shown before answering; the correct flag stays hidden
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerView {
    pub id: i64,
    pub answer: String,
}

impl From<QuestionAnswer> for AnswerView {
    fn from(answer: QuestionAnswer) -> Self {
        Self {
            id: answer.id,
            answer: answer.answer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizView {
    pub id: i64,
    pub course_id: i64,
    pub question: String,
    pub assets: Vec<Attachment>,
    pub answers: Vec<AnswerView>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct QuizAnswerCheck {
    pub answer_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizResultView {
    pub quiz: QuizView,
    pub choice: QuestionAnswer,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuizFilter {
    pub course_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str, is_correct: bool) -> AnswerForCreation {
        AnswerForCreation {
            answer: text.to_string(),
            is_correct,
        }
    }

    #[test]
    fn quiz_needs_exactly_one_correct_answer() {
        let mut dto = QuizForCreation {
            course_id: 1,
            question: "2 + 2?".to_string(),
            answers: vec![answer("4", true), answer("5", false)],
        };
        assert!(dto.validate().is_ok());

        dto.answers = vec![answer("4", true), answer("four", true)];
        assert!(dto.validate().is_err());

        dto.answers = vec![answer("4", true)];
        assert!(dto.validate().is_err());
    }
}
