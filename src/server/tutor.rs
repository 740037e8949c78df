//! Chat-style tutoring on top of the language model.

use http::request::Parts;
use hyper::body::Incoming;
use hyper::{Method, Response};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, StudyResult};
use crate::gemini;
use crate::pdf;

use super::serve::{self, Body};
use super::App;

pub async fn route(app: &App, parts: &Parts, incoming: Incoming) -> StudyResult<Response<Body>> {
    match (parts.method.clone(), parts.uri.path()) {
        (Method::POST, "/chat")       => chat(app, serve::json_body(incoming).await?).await,
        (Method::POST, "/upload-pdf") => ask_pdf(app, parts, incoming).await,
        _ => serve::not_found(),
    }
}

/// Body of a question; the chat client sends `message`, the dashboard `question`.
#[derive(Debug, Deserialize)]
pub struct Ask {
    #[serde(alias = "message")]
    question: Option<String>,
}

impl Ask {
    fn question(&self) -> StudyResult<&str> {
        self.question.as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::bad_request("No question provided"))
    }
}

async fn answer(app: &App, prompt: &str) -> StudyResult<Response<Body>> {
    let answer = app.tutor_model().generate(prompt).await?;
    serve::ok(&json!({ "answer": answer }))
}

pub async fn chat(app: &App, request: Ask) -> StudyResult<Response<Body>> {
    answer(app, &gemini::tutor_prompt(request.question()?)).await
}

pub async fn ask_pdf(app: &App, parts: &Parts, incoming: Incoming) -> StudyResult<Response<Body>> {
    let form = serve::multipart_form(parts, incoming, app.config().max_upload_bytes()).await?;
    let question = form.field("question")
        .ok_or_else(|| Error::bad_request("Missing PDF or question"))?;
    let file = form.file.clone()
        .ok_or_else(|| Error::bad_request("Missing PDF or question"))?;

    let material = pdf::extract_text(file).await?;
    answer(app, &gemini::pdf_tutor_prompt(&material, question)).await
}
