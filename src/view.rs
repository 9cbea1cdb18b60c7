use askama::Template;

use crate::form::{ResultState, SubmissionForm};
use crate::models::InputMode;

#[derive(Template)]
#[template(path = "index.html")]
pub struct PageTemplate {
    pub url_mode: bool,
    pub url: String,
    pub file_name: Option<String>,
    pub question: String,
    pub preview_src: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub response: Option<ResponseView>,
}

pub struct ResponseView {
    pub answer: String,
    pub model_used: String,
    pub error: Option<String>,
}

impl PageTemplate {
    pub fn from_form(form: &SubmissionForm) -> Self {
        let (error, response) = match form.result() {
            ResultState::Idle | ResultState::Loading => (None, None),
            ResultState::Failure { message } => (Some(message.clone()), None),
            ResultState::Success {
                answer,
                model_used,
                error,
            } => (
                None,
                Some(ResponseView {
                    answer: answer.clone(),
                    model_used: model_used.clone(),
                    error: error.clone(),
                }),
            ),
        };

        Self {
            url_mode: form.mode() == InputMode::Url,
            url: form.url().to_string(),
            file_name: form.file().map(|f| f.name.clone()),
            question: form.question().to_string(),
            preview_src: form.preview().map(|p| p.src().to_string()),
            loading: form.is_in_flight(),
            error,
            response,
        }
    }
}

pub fn render_page(form: &SubmissionForm) -> Result<String, askama::Error> {
    PageTemplate::from_form(form).render()
}
