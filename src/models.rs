use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    File,
    Url,
}

/// An uploaded image, kept in memory until it is replaced or the mode changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: InputMode,
    /// Unsent question text, carried over the mode switch.
    #[serde(default)]
    pub question: Option<String>,
}

/// Success body of the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub answer: String,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failure body of the analysis endpoint. `detail` is usually a string, but
/// request validation failures upstream put a list of objects there.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_without_error_note() {
        let parsed: AnalyzeResponse =
            serde_json::from_str(r#"{"answer":"A cat.","model_used":"gemini-1.5-flash"}"#).unwrap();
        assert_eq!(parsed.answer, "A cat.");
        assert_eq!(parsed.model_used, "gemini-1.5-flash");
        assert_eq!(parsed.error, None);
    }

    #[test]
    fn detail_must_be_a_non_empty_string() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail":"Invalid image format"}"#).unwrap();
        assert_eq!(body.detail_message().as_deref(), Some("Invalid image format"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail":""}"#).unwrap();
        assert_eq!(body.detail_message(), None);

        let body: ErrorBody =
            serde_json::from_str(r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#)
                .unwrap();
        assert_eq!(body.detail_message(), None);

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.detail_message(), None);
    }

    #[test]
    fn mode_is_lowercase_on_the_wire() {
        let req: ModeRequest = serde_json::from_str(r#"{"mode":"url"}"#).unwrap();
        assert_eq!(req.mode, InputMode::Url);
        assert_eq!(req.question, None);
        assert_eq!(serde_json::to_string(&InputMode::File).unwrap(), r#""file""#);
    }
}
