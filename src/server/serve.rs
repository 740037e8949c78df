use std::collections::HashMap;
use std::path::Path;

use futures::TryStreamExt;
use http::request::Parts;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, BodyStream, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::{Error, IntoStudyResult, StudyResult};

pub type Body = BoxBody<Bytes, Error>;

const JSON_LIMIT: usize = 8 * 1024 * 1024;

fn full<T: Into<Bytes>>(chunk: T) -> Body {
    Full::new(chunk.into())
        .map_err(|e| match e {})
        .boxed()
}

pub fn json<T: Serialize>(status: StatusCode, value: &T) -> StudyResult<Response<Body>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full(serde_json::to_vec(value)?))
        .into_result()
}

pub fn ok<T: Serialize>(value: &T) -> StudyResult<Response<Body>> {
    json(StatusCode::OK, value)
}

pub fn no_content() -> StudyResult<Response<Body>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(full(Bytes::new()))
        .into_result()
}

pub fn not_found() -> StudyResult<Response<Body>> {
    json(StatusCode::NOT_FOUND, &json!({ "error": "404 NOT FOUND" }))
}

/// JSON body describing a failed request.
pub fn error_response(e: &Error) -> StudyResult<Response<Body>> {
    let status = e.status();
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    let body = match e {
        Error::InvalidGeneration{ raw } => json!({ "error": e.to_string(), "raw": raw }),
        _ => json!({ "error": e.to_string() }),
    };
    json(status, &body)
}

#[derive(Debug, Clone, Copy)]
pub enum Cors<'a> {
    Origin(&'a str),
    Any,
}

pub fn with_cors(mut response: Response<Body>, cors: Cors) -> Response<Body> {
    let headers = response.headers_mut();
    let origin = match cors {
        Cors::Origin(origin) => {
            headers.insert("Access-Control-Allow-Credentials", HeaderValue::from_static("true"));
            HeaderValue::from_str(origin).unwrap_or(HeaderValue::from_static("null"))
        },
        Cors::Any => HeaderValue::from_static("*"),
    };
    headers.insert("Access-Control-Allow-Origin", origin);
    headers.insert("Access-Control-Allow-Methods", HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"));
    headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("Content-Type, Authorization"));
    response
}

pub async fn json_body<T: DeserializeOwned>(incoming: Incoming) -> StudyResult<T> {
    let bytes = Limited::new(incoming, JSON_LIMIT)
        .collect()
        .await
        .map_err(|e| Error::bad_request(format!("Could not read body: {}", e)))?
        .to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn query<T: DeserializeOwned>(parts: &Parts) -> StudyResult<T> {
    Ok(serde_urlencoded::from_str(parts.uri.query().unwrap_or(""))?)
}

/// A `multipart/form-data` upload: text fields plus at most one file.
#[derive(Debug, Default)]
pub struct Form {
    pub fields: HashMap<String, String>,
    pub file: Option<Bytes>,
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

pub async fn multipart_form(parts: &Parts, incoming: Incoming, limit: u64) -> StudyResult<Form> {
    let content_type = parts.headers.get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::bad_request("Expected multipart/form-data"))?;
    let boundary = multer::parse_boundary(content_type)?;

    let stream = BodyStream::new(incoming)
        .try_filter_map(|frame| async move { Ok::<_, hyper::Error>(frame.into_data().ok()) });
    let constraints = multer::Constraints::new()
        .size_limit(multer::SizeLimit::new().whole_stream(limit));
    let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

    let mut form = Form::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() || name == "file" {
            form.file = Some(field.bytes().await?);
        } else {
            form.fields.insert(name, field.text().await?);
        }
    }
    Ok(form)
}

/// Reads a question count sent either as a JSON number or as text.
pub fn question_count(value: Option<&Value>) -> StudyResult<u32> {
    let count = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    match count {
        Some(n @ 1..=50) => Ok(n as u32),
        _ => Err(Error::bad_request("numQuestions must be a number between 1 and 50")),
    }
}

pub async fn file(root: &Path, path: &str) -> StudyResult<Response<Body>> {
    let public = root.join("public");
    if !public.is_dir() {
        return not_found();
    }
    let request = Request::get(path).body(())?;
    match hyper_staticfile::Static::new(public).serve(request).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            let boxed_body = body
                .map_err(|e| e.into())
                .boxed();
            Ok(Response::from_parts(parts, boxed_body))
        },
        Err(e) => {
            warn!("Could not serve file: {}", e);
            not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_count_accepts_numbers_and_text() {
        assert_eq!(question_count(Some(&json!(3))).unwrap(), 3);
        assert_eq!(question_count(Some(&json!(" 7 "))).unwrap(), 7);
        assert!(question_count(None).is_err());
        assert!(question_count(Some(&json!(0))).is_err());
        assert!(question_count(Some(&json!(51))).is_err());
        assert!(question_count(Some(&json!("three"))).is_err());
        assert!(question_count(Some(&json!(2.5))).is_err());
    }

    #[test]
    fn errors_become_json_bodies() {
        let response = error_response(&Error::InvalidGeneration{ raw: "oops".into() }).unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn cors_headers() {
        let response = with_cors(no_content().unwrap(), Cors::Origin("http://localhost:3000"));
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "http://localhost:3000");
        assert_eq!(response.headers()["Access-Control-Allow-Credentials"], "true");

        let response = with_cors(no_content().unwrap(), Cors::Any);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
        assert!(response.headers().get("Access-Control-Allow-Credentials").is_none());
    }

    #[test]
    fn form_fields_are_trimmed() {
        let form = Form {
            fields: HashMap::from([("question".to_string(), "  why?  ".to_string()), ("empty".to_string(), " ".to_string())]),
            file: None,
        };
        assert_eq!(form.field("question"), Some("why?"));
        assert_eq!(form.field("empty"), None);
        assert_eq!(form.field("missing"), None);
    }
}
