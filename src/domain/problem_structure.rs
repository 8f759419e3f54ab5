use serde::{Deserialize, Serialize};

/// Normalized exam blueprint produced by the structuring stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemStructure {
    pub exam_meta: ExamMeta,
    pub structure: StructureBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamMeta {
    #[serde(default)]
    pub exam_title: String,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_duration: Option<i32>,
    #[serde(default)]
    pub open_book: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_materials: Vec<String>,
    #[serde(default)]
    pub question_format_is_latex: bool,
    #[serde(default)]
    pub answer_format_is_latex: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureBody {
    #[serde(default)]
    pub major_sections: Vec<MajorSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MajorSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl ProblemStructure {
    pub fn sub_question_count(&self) -> usize {
        self.structure
            .major_sections
            .iter()
            .map(|s| s.sub_questions.len())
            .sum()
    }
}
