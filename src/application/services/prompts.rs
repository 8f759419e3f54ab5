//! Fixed instruction templates for the two model calls.

pub const STRUCTURE_EXTRACTION_PROMPT: &str = r#"Analyze the input that follows and describe it as a JSON object.
Your response must start and end with the JSON object itself. Do not add any explanation, preamble or other text before or after it.

Step 1: decide whether the input is an exam paper or study material (lecture notes, a textbook chapter, slides).

Step 2a, exam paper: extract the structure exactly as written.
- exam_meta: the exam title and its settings.
- major_sections: one entry per major question.
- sub_questions: split every major question into its sub-questions and keep the original numbering in question_index.

Step 2b, study material: design the blueprint of a new exam that covers it.
- exam_meta.exam_title: a representative title for an exam on this material.
- major_sections: split the material into logical sections and give each a section_title.
- sub_questions: the concrete points each section should test, at keyword level.

Rules:
- Do not solve any question.
- Use the language of the input for every string value.
- Output only a JSON object matching this schema:
{
  "exam_meta": { "exam_title": "string", "exam_duration": "integer (minutes)", "open_book": "boolean", "allowed_materials": ["string"], "question_format_is_latex": "boolean", "answer_format_is_latex": "boolean" },
  "structure": {
    "major_sections": [
      { "section_index": "string", "section_title": "string", "sub_questions": [ { "question_index": "string", "topic": "string", "keywords": ["string"], "difficulty": "string" } ] }
    ]
  }
}"#;

pub const PROBLEM_GENERATION_PROMPT: &str = r#"Using the exam structure below, write a new university-level set of exam questions together with model answers.

Rules:
- Your response must start and end with the JSON object itself. Do not add any explanation or other text before or after it.
- Never include a LaTeX preamble or document commands such as \documentclass, \usepackage, \begin{document} or \end{document}.
- question_text and answer_text hold Markdown body text only.
- Write formulas inline ($...$) or as display math ($$...$$).
- Every backslash inside a JSON string must be escaped as \\.
- Use the language of the structure for every string value.
- Output only a JSON object matching this schema:
{
  "exam_meta": { "exam_title": "string", "open_book": "boolean", "question_format_is_latex": "boolean", "answer_format_is_latex": "boolean" },
  "questions": [
    { "question_index": "string", "topic": "string", "keywords": ["string"], "difficulty": "string", "question_text": "string", "answer_text": "string" }
  ]
}

Exam structure:
"#;
