use examsmith::application::services::{SanitizeError, sanitize_json_response};

#[test]
fn given_plain_json_when_sanitizing_then_returns_it_unchanged() {
    let sanitized = sanitize_json_response(r#"{"a": 1}"#).unwrap();

    assert_eq!(sanitized.json, r#"{"a": 1}"#);
    assert!(!sanitized.repaired);
}

#[test]
fn given_fenced_json_with_prose_when_sanitizing_then_extracts_fence_body() {
    let raw = "Here is the structure you asked for:\n```json\n{\"a\": [1, 2]}\n```\nLet me know!";

    let sanitized = sanitize_json_response(raw).unwrap();

    assert_eq!(sanitized.json, "{\"a\": [1, 2]}");
}

#[test]
fn given_uppercase_fence_tag_when_sanitizing_then_still_extracts() {
    let sanitized = sanitize_json_response("```JSON\n{\"b\": true}\n```").unwrap();

    assert_eq!(sanitized.json, "{\"b\": true}");
}

#[test]
fn given_latex_backslashes_when_sanitizing_then_repairs_and_preserves_text() {
    let raw = r#"{"question_text": "Compute \int_0^1 x\,dx and \sqrt{2}"}"#;

    let sanitized = sanitize_json_response(raw).unwrap();
    let value: serde_json::Value = serde_json::from_str(&sanitized.json).unwrap();

    assert!(sanitized.repaired);
    assert_eq!(
        value["question_text"],
        r#"Compute \int_0^1 x\,dx and \sqrt{2}"#
    );
}

#[test]
fn given_valid_escapes_when_sanitizing_then_keeps_their_meaning() {
    let raw = r#"{"text": "line\nbreak \"quoted\" \\ backslash é"}"#;

    let sanitized = sanitize_json_response(raw).unwrap();
    let value: serde_json::Value = serde_json::from_str(&sanitized.json).unwrap();

    assert!(!sanitized.repaired);
    assert_eq!(value["text"], "line\nbreak \"quoted\" \\ backslash é");
}

#[test]
fn given_empty_text_when_sanitizing_then_reports_empty() {
    assert_eq!(sanitize_json_response(""), Err(SanitizeError::Empty));
    assert_eq!(sanitize_json_response(" \n\t"), Err(SanitizeError::Empty));
}

#[test]
fn given_prose_without_json_when_sanitizing_then_error_embeds_the_text() {
    let raw = "I'm sorry, I cannot produce an exam from this input.";

    let error = sanitize_json_response(raw).unwrap_err();

    assert!(error.to_string().contains(raw));
    assert!(
        error
            .to_string()
            .starts_with("failed to parse valid JSON even after sanitization")
    );
}

#[test]
fn given_prose_with_backslashes_when_sanitizing_then_error_keeps_the_text_as_received() {
    let raw = r"Could not read the file at C:\temp\exam.pdf";

    let error = sanitize_json_response(raw).unwrap_err();

    assert_eq!(
        error,
        SanitizeError::Unparseable {
            text: raw.to_string()
        }
    );
    assert!(!error.to_string().contains(r"C:\\temp"));
}

#[test]
fn given_trailing_garbage_after_object_when_sanitizing_then_rejects() {
    assert!(sanitize_json_response(r#"{"a": 1} trailing"#).is_err());
}

#[test]
fn given_sanitized_output_when_sanitizing_again_then_result_is_stable() {
    let inputs = [
        r#"{"a": "\alpha"}"#,
        "```json\n{\"a\": \"\\\\beta\"}\n```",
        r#"[1, 2, {"c": null}]"#,
    ];

    for raw in inputs {
        let first = sanitize_json_response(raw).unwrap();
        let second = sanitize_json_response(&first.json).unwrap();

        assert_eq!(first.json, second.json, "input: {raw}");
        assert!(!second.repaired);
    }
}
