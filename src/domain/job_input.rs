const DEFAULT_BINARY_MEDIA_TYPE: &str = "application/pdf";

/// Raw material submitted for a job: exactly one of text or a binary upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    Text(String),
    Binary(Vec<u8>),
}

impl JobInput {
    /// Builds the input from the two nullable storage columns.
    ///
    /// Empty text is treated as absent so that rows created by an upload with
    /// an empty text field still resolve to the binary payload.
    pub fn from_columns(
        text: Option<String>,
        binary: Option<Vec<u8>>,
    ) -> Result<Self, JobInputError> {
        let text = text.filter(|t| !t.is_empty());
        let binary = binary.filter(|b| !b.is_empty());

        match (text, binary) {
            (Some(text), None) => Ok(Self::Text(text)),
            (None, Some(binary)) => Ok(Self::Binary(binary)),
            (Some(_), Some(_)) => Err(JobInputError::Ambiguous),
            (None, None) => Err(JobInputError::Missing),
        }
    }

    /// Media type sent to the model alongside binary input.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "text/plain",
            Self::Binary(data) => sniff_media_type(data),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sniff_media_type(data: &[u8]) -> &'static str {
    if data.starts_with(b"%PDF") {
        "application/pdf"
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_BINARY_MEDIA_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobInputError {
    #[error("no input data found")]
    Missing,
    #[error("both text and file input are present")]
    Ambiguous,
}
