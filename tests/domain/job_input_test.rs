use examsmith::domain::{JobInput, JobInputError};

#[test]
fn given_text_only_when_building_input_then_returns_text() {
    let input = JobInput::from_columns(Some("2+2=?".to_string()), None);

    assert_eq!(input, Ok(JobInput::Text("2+2=?".to_string())));
}

#[test]
fn given_empty_text_and_file_when_building_input_then_file_wins() {
    let input = JobInput::from_columns(Some(String::new()), Some(b"%PDF-1.7".to_vec()));

    assert_eq!(input, Ok(JobInput::Binary(b"%PDF-1.7".to_vec())));
}

#[test]
fn given_no_input_when_building_input_then_reports_missing() {
    assert_eq!(
        JobInput::from_columns(None, Some(Vec::new())),
        Err(JobInputError::Missing)
    );
}

#[test]
fn given_text_and_file_when_building_input_then_reports_ambiguous() {
    let input = JobInput::from_columns(Some("notes".to_string()), Some(vec![1, 2, 3]));

    assert_eq!(input, Err(JobInputError::Ambiguous));
}

#[test]
fn given_binary_payloads_when_sniffing_media_type_then_detects_common_formats() {
    let cases: [(&[u8], &str); 5] = [
        (b"%PDF-1.4 ...", "application/pdf"),
        (&[0x89, b'P', b'N', b'G', 0x0D, 0x0A], "image/png"),
        (&[0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg"),
        (b"RIFF\x00\x00\x00\x00WEBPVP8 ", "image/webp"),
        (b"unknown bytes", "application/pdf"),
    ];

    for (data, expected) in cases {
        assert_eq!(JobInput::Binary(data.to_vec()).media_type(), expected);
    }
}

#[test]
fn given_text_input_when_reading_media_type_then_is_plain_text() {
    assert_eq!(JobInput::Text("x".to_string()).media_type(), "text/plain");
}
