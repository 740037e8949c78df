use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Http error: {0}")]
    Http(#[from] http::Error),
    #[error("Hyper error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Multipart error: {0}")]
    Multipart(#[from] multer::Error),
    #[error("Query error: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
    #[error("Could not read PDF: {0}")]
    Pdf(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Gemini returned invalid JSON")]
    InvalidGeneration { raw: String },
    #[error("Gemini error: {0}")]
    Gemini(String),
    #[error("GEMINI_API_KEY is missing")]
    MissingApiKey,
    #[error("Database error: {0}")]
    Database(String),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Json(_) | Error::Multipart(_) | Error::Query(_) | Error::Pdf(_) | Error::BadRequest(_)
                => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InvalidGeneration{..} => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type StudyResult<T> = Result<T, Error>;

pub trait IntoStudyResult<T> {
    fn into_result(self) -> StudyResult<T>;
}

impl<T> IntoStudyResult<T> for http::Result<T> {
    fn into_result(self) -> StudyResult<T> {
        Ok(self?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(Error::bad_request("Missing text").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Conflict("busy".into()).status(), StatusCode::CONFLICT);
        assert_eq!(Error::NotFound("none".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::InvalidGeneration{ raw: "x".into() }.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(Error::MissingApiKey.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
