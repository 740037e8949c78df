//! Routes of the study API: quizzes, results, dashboard and to-dos.

use std::borrow::Cow;

use chrono::Utc;
use http::request::Parts;
use hyper::body::Incoming;
use hyper::{Method, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::database::check_key;
use crate::error::{Error, StudyResult};
use crate::grading::{self, AnswerMap, Question};
use crate::pdf;
use crate::records::{self, QuizResultRecord, TodoRecord};

use super::serve::{self, Body};
use super::{tutor, App};

/// Percent-decoded path segments, so `a%20b` names the key `a b`.
fn segments(path: &str) -> StudyResult<Vec<Cow<'_, str>>> {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::decode(segment)
            .map_err(|_| Error::bad_request(format!("Malformed path segment: {}", segment))))
        .collect()
}

pub async fn route(app: &App, parts: &Parts, incoming: Incoming) -> StudyResult<Response<Body>> {
    let path = parts.uri.path();
    let decoded = segments(path)?;
    let segments: Vec<&str> = decoded.iter().map(|s| s.as_ref()).collect();
    match (parts.method.clone(), segments.as_slice()) {
        (Method::POST, ["generate-quiz"])                      => generate_quiz(app, serve::json_body(incoming).await?).await,
        (Method::POST, ["upload-pdf"])                         => upload_pdf(app, parts, incoming).await,
        (Method::POST, ["submit-quiz"])                        => submit_quiz(app, serve::json_body(incoming).await?).await,
        (Method::POST, ["api", "quiz", "score"])               => score(serve::json_body(incoming).await?),
        (Method::POST, ["api", "quiz", "session", "generate"]) => session_generate(app, serve::json_body(incoming).await?).await,
        (Method::POST, ["api", "quiz", "session", "select"])   => session_select(app, serve::json_body(incoming).await?).await,
        (Method::POST, ["api", "quiz", "session", "reset"])    => session_reset(app, serve::json_body(incoming).await?).await,
        (Method::POST, ["api", "quiz", "session", "submit"])   => session_submit(app, serve::json_body(incoming).await?).await,
        (Method::GET, ["api", "quiz", "session", user])        => session_view(app, user).await,
        (Method::GET, ["api", "dashboard", "stats", user])     => dashboard_stats(app, user).await,
        (Method::GET, ["api", "dashboard", "recent-score", user]) => recent_score(app, user).await,
        (Method::GET, ["api", "dashboard", "progress", user])  => progress(app, user).await,
        (Method::POST, ["api", "ai-tutor", "ask"])             => tutor::chat(app, serve::json_body(incoming).await?).await,
        (Method::POST, ["api", "ai-tutor", "pdf"])             => tutor::ask_pdf(app, parts, incoming).await,
        (Method::GET, ["test-gemini"])                         => test_gemini(app).await,
        (Method::GET, ["api", "todos", user])                  => list_todos(app, user).await,
        (Method::POST, ["api", "todos"])                       => add_todo(app, serve::json_body(incoming).await?).await,
        (Method::PUT, ["api", "todos", task])                  => update_todo(app, task, serve::json_body(incoming).await?).await,
        (Method::DELETE, ["api", "todos", task])               => delete_todo(app, task, serve::query(parts)?).await,
        (Method::GET, _)                                       => serve::file(app.root(), path).await,
        _ => serve::not_found(),
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> StudyResult<&'a str> {
    value.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::bad_request(format!("Missing {}", name)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQuiz {
    text: Option<String>,
    num_questions: Option<Value>,
}

async fn generate_quiz(app: &App, request: GenerateQuiz) -> StudyResult<Response<Body>> {
    let text = required(&request.text, "text")?;
    let count = serve::question_count(request.num_questions.as_ref())?;
    let quiz = app.quiz_model().generate_quiz(text, count).await?;
    serve::ok(&json!({ "quiz": quiz }))
}

async fn pdf_quiz(app: &App, parts: &Parts, incoming: Incoming) -> StudyResult<Vec<Question>> {
    let form = serve::multipart_form(parts, incoming, app.config().max_upload_bytes()).await?;
    let file = form.file.clone().ok_or_else(|| Error::bad_request("Missing PDF file"))?;
    let count = serve::question_count(form.field("numQuestions").map(|n| Value::String(n.into())).as_ref())?;
    info!("PDF upload received: {} bytes", file.len());

    let text = pdf::extract_text(file).await?;
    app.quiz_model().generate_quiz(&text, count).await
}

async fn upload_pdf(app: &App, parts: &Parts, incoming: Incoming) -> StudyResult<Response<Body>> {
    let quiz = pdf_quiz(app, parts, incoming).await?;
    serve::ok(&json!({ "quiz": quiz }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitQuiz {
    user_id: Option<String>,
    email: Option<String>,
    quiz_id: Option<String>,
    score: Option<f64>,
    submitted_at: Option<String>,
}

async fn submit_quiz(app: &App, request: SubmitQuiz) -> StudyResult<Response<Body>> {
    let user = check_key(required(&request.user_id, "userId")?)?;
    let email = required(&request.email, "email")?;
    let score = request.score.ok_or_else(|| Error::bad_request("Missing score"))?;

    let record = QuizResultRecord {
        user_id: user.into(),
        email: email.into(),
        quiz_id: request.quiz_id.clone(),
        score,
        submitted_at: request.submitted_at.clone()
            .unwrap_or_else(|| records::iso_timestamp(Utc::now())),
        ..Default::default()
    };
    let key = app.database().push(&format!("quizResults/{}", user), &record).await?;
    serve::ok(&json!({ "message": "Quiz result saved successfully!", "quizId": key }))
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    quiz: Vec<Question>,
    #[serde(default)]
    answers: AnswerMap,
}

fn score(request: ScoreRequest) -> StudyResult<Response<Body>> {
    serve::ok(&json!({
        "score": grading::compute_score(&request.quiz, &request.answers),
        "total": request.quiz.len(),
        "unresolved": grading::unresolved(&request.quiz),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionGenerate {
    user_id: Option<String>,
    text: Option<String>,
    num_questions: Option<Value>,
}

async fn session_generate(app: &App, request: SessionGenerate) -> StudyResult<Response<Body>> {
    let user = check_key(required(&request.user_id, "userId")?)?;
    let text = required(&request.text, "text")?;
    let count = serve::question_count(request.num_questions.as_ref())?;

    let _guard = app.sessions().begin_generation(user).await?;
    let quiz = app.quiz_model().generate_quiz(text, count).await?;
    app.sessions().load(user, quiz.clone()).await;
    serve::ok(&json!({ "quiz": quiz, "unresolved": grading::unresolved(&quiz) }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSelect {
    user_id: Option<String>,
    question: usize,
    option: usize,
}

async fn session_select(app: &App, request: SessionSelect) -> StudyResult<Response<Body>> {
    let user = required(&request.user_id, "userId")?;
    let card = app.sessions().select(user, request.question, request.option).await?;
    serve::ok(&card)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionUser {
    user_id: Option<String>,
}

async fn session_reset(app: &App, request: SessionUser) -> StudyResult<Response<Body>> {
    let user = required(&request.user_id, "userId")?;
    app.sessions().reset(user).await;
    serve::ok(&json!({ "message": "Quiz reset" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSubmit {
    user_id: Option<String>,
    email: Option<String>,
    quiz_id: Option<String>,
}

async fn session_submit(app: &App, request: SessionSubmit) -> StudyResult<Response<Body>> {
    let user = check_key(required(&request.user_id, "userId")?)?;
    let email = required(&request.email, "email")?;

    let final_score = app.sessions().finish(user).await?;
    let record = QuizResultRecord::graded(user, email, request.quiz_id.clone(), final_score.score, final_score.total, Utc::now());
    let key = match app.database().push(&format!("quizResults/{}", user), &record).await {
        Ok(key) => key,
        Err(e) => {
            app.sessions().abort_submit(user, final_score).await;
            return Err(e);
        }
    };
    app.sessions().mark_submitted(user, final_score).await;
    info!("{} submitted quiz {} with score {}/{}", user, key, final_score.score, final_score.total);

    serve::ok(&json!({
        "message": "Quiz result saved successfully!",
        "quizId": key,
        "score": final_score.score,
        "totalQuestions": final_score.total,
    }))
}

async fn session_view(app: &App, user: &str) -> StudyResult<Response<Body>> {
    match app.sessions().view(user).await {
        Some(view) => serve::ok(&view),
        None => Err(Error::NotFound(format!("No quiz session for {}", user))),
    }
}

async fn quiz_results(app: &App, user: &str) -> StudyResult<Vec<QuizResultRecord>> {
    let user = check_key(user)?;
    let node = app.database().get(&format!("quizResults/{}", user)).await?;
    Ok(records::children(node).into_iter().map(|(_, record)| record).collect())
}

async fn dashboard_stats(app: &App, user: &str) -> StudyResult<Response<Body>> {
    let results = quiz_results(app, user).await?;
    serve::ok(&records::dashboard_stats(&results))
}

async fn recent_score(app: &App, user: &str) -> StudyResult<Response<Body>> {
    let results = quiz_results(app, user).await?;
    serve::ok(&records::latest_score(&results))
}

async fn progress(app: &App, user: &str) -> StudyResult<Response<Body>> {
    let results = quiz_results(app, user).await?;
    match records::progress(&results) {
        Some(progress) => serve::ok(&progress),
        None => serve::ok(&json!({ "message": "No scores found for this user." })),
    }
}

async fn test_gemini(app: &App) -> StudyResult<Response<Body>> {
    info!("Testing Gemini API connection...");
    match app.quiz_model().generate(crate::gemini::GREETING_PROMPT).await {
        Ok(reply) => serve::ok(&json!({ "success": true, "message": reply })),
        Err(e) => serve::json(e.status(), &json!({ "success": false, "error": e.to_string() })),
    }
}

async fn list_todos(app: &App, user: &str) -> StudyResult<Response<Body>> {
    let user = check_key(user)?;
    let node = app.database().get(&format!("todos/{}", user)).await?;
    serve::ok(&json!({ "tasks": records::sorted_todos(records::children(node)) }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTodo {
    user_id: Option<String>,
    task: Option<String>,
}

async fn add_todo(app: &App, request: AddTodo) -> StudyResult<Response<Body>> {
    let user = check_key(required(&request.user_id, "userId")?)?;
    let task = required(&request.task, "task")?;
    let key = app.database().push(&format!("todos/{}", user), &TodoRecord::new(task, Utc::now())).await?;
    serve::ok(&json!({ "message": "Task added successfully!", "taskId": key }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTodo {
    user_id: Option<String>,
    completed: Option<bool>,
}

async fn update_todo(app: &App, task: &str, request: UpdateTodo) -> StudyResult<Response<Body>> {
    let user = check_key(required(&request.user_id, "userId")?)?;
    let completed = request.completed.ok_or_else(|| Error::bad_request("Missing completed status"))?;
    let task = check_key(task)?;
    let patch = json!({ "completed": completed, "updatedAt": records::iso_timestamp(Utc::now()) });
    app.database().update(&format!("todos/{}/{}", user, task), &patch).await?;
    serve::ok(&json!({ "message": "Task updated successfully!" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteTodo {
    user_id: Option<String>,
}

async fn delete_todo(app: &App, task: &str, request: DeleteTodo) -> StudyResult<Response<Body>> {
    let user = check_key(required(&request.user_id, "userId")?)?;
    let task = check_key(task)?;
    app.database().remove(&format!("todos/{}/{}", user, task)).await?;
    serve::ok(&json!({ "message": "Task deleted successfully!" }))
}
