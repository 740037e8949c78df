//! Client for the generative-language API plus the prompts sent to it.

use std::time::Duration;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, StudyResult};
use crate::grading::Question;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &Config, model: &str) -> StudyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(GeminiClient {
            http,
            base_url: config.gemini_base_url().to_string(),
            model: model.to_string(),
            api_key: config.gemini_api_key().map(|k| k.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Sends a single user turn and returns the text of the first candidate.
    pub async fn generate(&self, prompt: &str) -> StudyResult<String> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingApiKey)?;
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        debug!("Sending prompt to {} ({} chars)", self.model, prompt.len());
        let response = self.http.post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Gemini answered {}: {}", status, detail);
            return Err(Error::Gemini(format!("{} {}", status, detail)));
        }

        let text = response_text(response.json().await?)?;
        info!("Gemini raw response: {} ...", text.chars().take(200).collect::<String>());
        Ok(text)
    }

    pub async fn generate_quiz(&self, text: &str, num_questions: u32) -> StudyResult<Vec<Question>> {
        info!("Generating quiz from raw text, length: {}", text.len());
        let raw = self.generate(&quiz_prompt(text, num_questions)).await?;
        parse_quiz(&raw)
    }
}

fn response_text(response: GenerateResponse) -> StudyResult<String> {
    let parts = response.candidates.into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .ok_or_else(|| Error::Gemini("response contained no candidates".into()))?;
    Ok(parts.into_iter().filter_map(|p| p.text).collect())
}

pub fn quiz_prompt(text: &str, num_questions: u32) -> String {
    format!(r#"
Generate {num_questions} multiple-choice questions from the study material below.
Each question must have exactly 4 options.
Output must be valid JSON in this format:
[
  {{ "question": "string", "options": ["A","B","C","D"], "answer": "must be one of the options" }}
]

Study Material:
{text}
"#)
}

pub fn tutor_prompt(question: &str) -> String {
    format!("Answer clearly in 3–6 bullet points:\n\n{}", question)
}

pub fn pdf_tutor_prompt(material: &str, question: &str) -> String {
    format!(
        "From the following study material, answer the question in 3–6 bullet points:\n\nStudy Material:\n{}\n\nQuestion: {}",
        material, question
    )
}

pub const GREETING_PROMPT: &str = "Say a short hello message for StudyMate students!";

/// Removes a markdown code fence (and its `json` tag) around a model reply,
/// also when the fence shares a line with the content.
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

pub fn parse_quiz(raw: &str) -> StudyResult<Vec<Question>> {
    let cleaned = strip_fences(raw);
    match serde_json::from_str(&cleaned) {
        Ok(quiz) => Ok(quiz),
        Err(e) => {
            warn!("Gemini returned invalid JSON: {}", e);
            Err(Error::InvalidGeneration{ raw: cleaned })
        }
    }
}
