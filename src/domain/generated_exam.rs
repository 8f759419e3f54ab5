use serde::{Deserialize, Serialize};

/// Final question/answer set produced by the generation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExam {
    pub exam_meta: GeneratedExamMeta,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExamMeta {
    #[serde(default)]
    pub exam_title: String,
    #[serde(default)]
    pub open_book: bool,
    #[serde(default)]
    pub question_format_is_latex: bool,
    #[serde(default)]
    pub answer_format_is_latex: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub question_index: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty: String,
    pub question_text: String,
    pub answer_text: String,
}

impl GeneratedExam {
    /// Rejects payloads that parse but carry nothing a student could use.
    pub fn validate(&self) -> Result<(), GeneratedExamError> {
        if self.questions.is_empty() {
            return Err(GeneratedExamError::NoQuestions);
        }

        for (position, question) in self.questions.iter().enumerate() {
            if question.question_text.trim().is_empty() {
                return Err(GeneratedExamError::EmptyQuestionText(position));
            }
            if question.answer_text.trim().is_empty() {
                return Err(GeneratedExamError::EmptyAnswerText(position));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratedExamError {
    #[error("generated output contains no questions")]
    NoQuestions,
    #[error("question at position {0} has empty question_text")]
    EmptyQuestionText(usize),
    #[error("question at position {0} has empty answer_text")]
    EmptyAnswerText(usize),
}
