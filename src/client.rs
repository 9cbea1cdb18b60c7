use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use url::Url;

use crate::config::Config;
use crate::form::{Submission, SubmissionImage};
use crate::models::{AnalyzeResponse, ErrorBody};

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "multimodal-qa-form/0.1";

pub const GENERIC_FAILURE_MSG: &str = "An error occurred while processing your request";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("{0}")]
    Request(String),
    #[error("analysis endpoint returned {status}")]
    Server {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("could not decode analysis response: {0}")]
    Decode(String),
}

impl AnalyzeError {
    /// The message shown on the page: the server's `detail` when it sent one,
    /// the generic message otherwise.
    pub fn user_message(&self) -> String {
        match self {
            AnalyzeError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => GENERIC_FAILURE_MSG.to_string(),
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnalyzeClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl AnalyzeClient {
    pub fn new(config: &Config) -> Result<Self, AnalyzeError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if config.insecure_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| AnalyzeError::Request(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.analyze_url.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one multipart POST for `submission`. Never retries.
    pub async fn analyze(&self, submission: &Submission) -> Result<AnalyzeResponse, AnalyzeError> {
        let form = build_form(submission)?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzeError::Request(format!("TimeoutError: {}", e))
                } else if e.is_connect() {
                    AnalyzeError::Request(format!("ConnectError: {}", e))
                } else {
                    AnalyzeError::Request(format!("RequestError: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail_message());
            return Err(AnalyzeError::Server { status, detail });
        }

        response
            .json::<AnalyzeResponse>()
            .await
            .map_err(|e| AnalyzeError::Decode(e.to_string()))
    }
}

fn build_form(submission: &Submission) -> Result<Form, AnalyzeError> {
    let form = match &submission.image {
        SubmissionImage::File(file) => {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| AnalyzeError::Request(format!("invalid content type: {}", e)))?;
            Form::new().part("image", part)
        }
        SubmissionImage::Url(url) => Form::new().text("image_url", url.clone()),
    };
    Ok(form.text("question", submission.question.clone()))
}
