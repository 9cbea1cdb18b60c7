use serde::Serialize;

use crate::client::AnalyzeError;
use crate::models::{AnalyzeResponse, ImageFile, InputMode};

// ── Error types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please upload an image")]
    MissingFile,
    #[error("Please enter an image URL")]
    MissingUrl,
    #[error("Please enter a question")]
    MissingQuestion,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("a request is already in flight")]
    InFlight,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

// ── State types ──────────────────────────────────────────────────────────────

/// The active input mode together with its value. Switching modes replaces
/// the variant, so a file and a URL can never be held at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(Option<ImageFile>),
    Url(String),
}

impl ImageSource {
    fn empty(mode: InputMode) -> Self {
        match mode {
            InputMode::File => ImageSource::File(None),
            InputMode::Url => ImageSource::Url(String::new()),
        }
    }

    pub fn mode(&self) -> InputMode {
        match self {
            ImageSource::File(_) => InputMode::File,
            ImageSource::Url(_) => InputMode::Url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ResultState {
    Idle,
    Loading,
    Success {
        answer: String,
        model_used: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Failure {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "src", rename_all = "lowercase")]
pub enum Preview {
    /// Served by this application from the stored upload.
    Local(String),
    /// Handed to the browser as typed.
    Remote(String),
}

impl Preview {
    pub fn src(&self) -> &str {
        match self {
            Preview::Local(src) | Preview::Remote(src) => src,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionImage {
    File(ImageFile),
    Url(String),
}

/// Snapshot of a validated form, detached from the controller so the request
/// can be sent without holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub image: SubmissionImage,
    pub question: String,
}

impl Submission {
    pub fn mode(&self) -> InputMode {
        match self.image {
            SubmissionImage::File(_) => InputMode::File,
            SubmissionImage::Url(_) => InputMode::Url,
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SubmissionForm {
    source: ImageSource,
    question: String,
    result: ResultState,
    in_flight: bool,
    file_generation: u64,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        Self {
            source: ImageSource::File(None),
            question: String::new(),
            result: ResultState::Idle,
            in_flight: false,
            file_generation: 0,
        }
    }
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.source.mode()
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn result(&self) -> &ResultState {
        &self.result
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn file_generation(&self) -> u64 {
        self.file_generation
    }

    /// The stored upload, if any.
    pub fn file(&self) -> Option<&ImageFile> {
        match &self.source {
            ImageSource::File(file) => file.as_ref(),
            ImageSource::Url(_) => None,
        }
    }

    pub fn url(&self) -> &str {
        match &self.source {
            ImageSource::Url(url) => url,
            ImageSource::File(_) => "",
        }
    }

    pub fn preview(&self) -> Option<Preview> {
        match &self.source {
            ImageSource::File(Some(_)) => {
                Some(Preview::Local(format!("/preview/{}", self.file_generation)))
            }
            ImageSource::File(None) => None,
            ImageSource::Url(url) if url.is_empty() => None,
            ImageSource::Url(url) => Some(Preview::Remote(url.clone())),
        }
    }

    pub fn select_input_mode(&mut self, mode: InputMode) {
        if self.source.mode() == mode {
            return;
        }
        tracing::debug!(?mode, "switching input mode");
        self.source = ImageSource::empty(mode);
    }

    pub fn set_file(&mut self, file: ImageFile) {
        self.file_generation += 1;
        self.source = ImageSource::File(Some(file));
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.source = ImageSource::Url(url.into());
    }

    pub fn set_question(&mut self, text: impl Into<String>) {
        self.question = text.into();
    }

    /// First half of a submit: validates the form and, on success, marks it
    /// in flight and hands back the payload to send. Validation failures are
    /// stored as the visible result.
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitRejected> {
        if self.in_flight {
            return Err(SubmitRejected::InFlight);
        }

        let submission = match self.validate() {
            Ok(submission) => submission,
            Err(e) => {
                self.result = ResultState::Failure {
                    message: e.to_string(),
                };
                return Err(e.into());
            }
        };

        self.result = ResultState::Loading;
        self.in_flight = true;
        Ok(submission)
    }

    /// Second half of a submit. Always clears the in-flight flag.
    pub fn settle(&mut self, outcome: Result<AnalyzeResponse, AnalyzeError>) {
        self.in_flight = false;
        self.result = match outcome {
            Ok(response) => ResultState::Success {
                answer: response.answer,
                model_used: response.model_used,
                error: response.error,
            },
            Err(e) => ResultState::Failure {
                message: e.user_message(),
            },
        };
    }

    /// Shows `message` as the result of a submit that never reached
    /// validation. Ignored while a request is in flight.
    pub fn reject(&mut self, message: impl Into<String>) {
        if self.in_flight {
            return;
        }
        self.result = ResultState::Failure {
            message: message.into(),
        };
    }

    fn validate(&self) -> Result<Submission, ValidationError> {
        let image = match &self.source {
            ImageSource::File(None) => return Err(ValidationError::MissingFile),
            ImageSource::File(Some(file)) => SubmissionImage::File(file.clone()),
            ImageSource::Url(url) if url.is_empty() => return Err(ValidationError::MissingUrl),
            ImageSource::Url(url) => SubmissionImage::Url(url.clone()),
        };
        if self.question.is_empty() {
            return Err(ValidationError::MissingQuestion);
        }
        Ok(Submission {
            image,
            question: self.question.clone(),
        })
    }
}
