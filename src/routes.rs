use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::client::{AnalyzeClient, AnalyzeError};
use crate::form::{Preview, ResultState, SubmissionForm, SubmitRejected};
use crate::models::{ImageFile, InputMode, ModeRequest};
use crate::view::render_page;

#[derive(Clone)]
pub struct AppState {
    pub form: Arc<Mutex<SubmissionForm>>,
    pub client: Arc<AnalyzeClient>,
}

impl AppState {
    pub fn new(client: AnalyzeClient) -> Self {
        Self {
            form: Arc::new(Mutex::new(SubmissionForm::new())),
            client: Arc::new(client),
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/mode", post(select_mode))
        .route("/submit", post(submit))
        .route("/preview/:generation", get(preview))
        .route("/api/state", get(form_state))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn index(State(state): State<AppState>) -> Response {
    let form = state.form.lock().await;
    page(StatusCode::OK, &form)
}

async fn select_mode(State(state): State<AppState>, Form(req): Form<ModeRequest>) -> Redirect {
    let mut form = state.form.lock().await;
    form.select_input_mode(req.mode);
    if let Some(question) = req.question {
        form.set_question(question);
    }
    Redirect::to("/")
}

/// Fields posted by the page. `image` is absent from the page in URL mode
/// and `image_url` is absent in file mode.
#[derive(Debug, Default)]
struct SubmitFields {
    file: Option<ImageFile>,
    url: Option<String>,
    question: Option<String>,
}

async fn read_fields(mut multipart: Multipart) -> Result<SubmitFields, String> {
    let mut fields = SubmitFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to parse multipart data: {}", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "image" => {
                let name = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read image: {}", e))?;
                // Browsers send an empty part when no file was chosen.
                if !name.is_empty() && !bytes.is_empty() {
                    fields.file = Some(ImageFile::new(name, content_type, bytes.to_vec()));
                }
            }
            "image_url" => {
                fields.url = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("Failed to read image_url: {}", e))?,
                );
            }
            "question" => {
                fields.question = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("Failed to read question: {}", e))?,
                );
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(fields)
}

async fn submit(State(state): State<AppState>, multipart: Multipart) -> Response {
    {
        let form = state.form.lock().await;
        if form.is_in_flight() {
            tracing::warn!("submit ignored, a request is already in flight");
            return page(StatusCode::CONFLICT, &form);
        }
    }

    // The upload is read without the lock; a large or slow body must not
    // stall other requests.
    let fields = read_fields(multipart).await;

    let submission = {
        let mut form = state.form.lock().await;

        if form.is_in_flight() {
            tracing::warn!("submit ignored, a request is already in flight");
            return page(StatusCode::CONFLICT, &form);
        }

        let fields = match fields {
            Ok(fields) => fields,
            Err(detail) => {
                tracing::warn!(%detail, "rejecting malformed submission");
                form.reject(detail);
                return page(StatusCode::BAD_REQUEST, &form);
            }
        };

        if let Some(file) = fields.file {
            form.set_file(file);
        }
        if let Some(url) = fields.url {
            form.set_url(url);
        }
        if let Some(question) = fields.question {
            form.set_question(question);
        }

        match form.begin_submit() {
            Ok(submission) => submission,
            Err(SubmitRejected::InFlight) => return page(StatusCode::CONFLICT, &form),
            Err(SubmitRejected::Invalid(e)) => {
                tracing::info!(error = %e, "submission failed validation");
                return page(StatusCode::UNPROCESSABLE_ENTITY, &form);
            }
        }
    };

    // The request and the settle run in their own task so the form is
    // settled even if this handler is dropped by a disconnecting client.
    let task_state = state.clone();
    let settled = tokio::spawn(async move {
        tracing::info!(
            mode = ?submission.mode(),
            endpoint = %task_state.client.endpoint(),
            "sending analysis request"
        );
        let outcome = task_state.client.analyze(&submission).await;
        match &outcome {
            Ok(response) => tracing::info!(model = %response.model_used, "analysis succeeded"),
            Err(e) => tracing::warn!(error = %e, "analysis failed"),
        }
        task_state.form.lock().await.settle(outcome);
    });

    if let Err(e) = settled.await {
        tracing::error!(error = %e, "analysis task did not finish");
        state
            .form
            .lock()
            .await
            .settle(Err(AnalyzeError::Request(e.to_string())));
    }

    let form = state.form.lock().await;
    page(StatusCode::OK, &form)
}

async fn preview(State(state): State<AppState>, Path(generation): Path<u64>) -> Response {
    let form = state.form.lock().await;
    match form.file() {
        Some(file) if form.file_generation() == generation => (
            [
                (header::CONTENT_TYPE, file.content_type.clone()),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            file.bytes.clone(),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Serialize)]
struct FormSnapshot {
    mode: InputMode,
    url: String,
    file_name: Option<String>,
    question: String,
    preview: Option<Preview>,
    result: ResultState,
    in_flight: bool,
}

async fn form_state(State(state): State<AppState>) -> Json<FormSnapshot> {
    let form = state.form.lock().await;
    Json(FormSnapshot {
        mode: form.mode(),
        url: form.url().to_string(),
        file_name: form.file().map(|f| f.name.clone()),
        question: form.question().to_string(),
        preview: form.preview(),
        result: form.result().clone(),
        in_flight: form.is_in_flight(),
    })
}

fn page(status: StatusCode, form: &SubmissionForm) -> Response {
    match render_page(form) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Failed to render page"})),
            )
                .into_response()
        }
    }
}
