//! REST access to the hosted realtime database.
//!
//! Every node is addressed as `{database_url}/{path}.json`. Writes through
//! `push` get a generated, chronologically sortable key back from the server.

use std::time::Duration;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, StudyResult};

#[derive(Debug, Clone)]
pub struct Database {
    http: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl Database {
    pub fn new(config: &Config) -> StudyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Database {
            http,
            base_url: config.database_url().to_string(),
            auth: config.database_auth().map(|a| a.to_string()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        debug!("{} {}", method, path);
        let request = self.http.request(method, self.url(path));
        match &self.auth {
            Some(auth) => request.query(&[("auth", auth)]),
            None => request,
        }
    }

    async fn send(request: reqwest::RequestBuilder) -> StudyResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(Error::Database(format!("{} {}", status, detail)))
        }
    }

    /// Appends `value` under `path` and returns the generated key.
    pub async fn push<T: Serialize>(&self, path: &str, value: &T) -> StudyResult<String> {
        let response = Self::send(self.request(reqwest::Method::POST, path).json(value)).await?;
        Ok(response.json::<PushResponse>().await?.name)
    }

    /// Reads the node at `path`; an absent node is `None`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> StudyResult<Option<T>> {
        let response = Self::send(self.request(reqwest::Method::GET, path)).await?;
        Ok(response.json::<Option<T>>().await?)
    }

    pub async fn update<T: Serialize>(&self, path: &str, value: &T) -> StudyResult<()> {
        Self::send(self.request(reqwest::Method::PATCH, path).json(value)).await?;
        Ok(())
    }

    pub async fn remove(&self, path: &str) -> StudyResult<()> {
        Self::send(self.request(reqwest::Method::DELETE, path)).await?;
        Ok(())
    }
}

/// Rejects ids that would escape their node in a database path.
pub fn check_key(key: &str) -> StudyResult<&str> {
    let forbidden = ['.', '#', '$', '[', ']', '/'];
    if key.is_empty() || key.contains(forbidden) {
        Err(Error::bad_request(format!("Invalid key: {:?}", key)))
    } else {
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_urls() {
        let db = Database::new(&Config::default()).unwrap();
        assert_eq!(
            db.url("/quizResults/user1/"),
            "https://studymate-e2268-default-rtdb.firebaseio.com/quizResults/user1.json"
        );
    }

    #[test]
    fn keys_cannot_escape_their_node() {
        assert_eq!(check_key("uid42").unwrap(), "uid42");
        assert!(check_key("").is_err());
        assert!(check_key("../todos").is_err());
        assert!(check_key("a/b").is_err());
        assert!(check_key("a#b").is_err());
    }
}
