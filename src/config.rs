use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::StudyResult;

const CONFIG_FILE: &str = "studymate.config";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    gemini_model: String,
    tutor_model: String,
    gemini_base_url: String,
    database_url: String,
    allowed_origin: String,
    max_upload_bytes: u64,
    #[serde(skip)]
    gemini_api_key: Option<String>,
    #[serde(skip)]
    database_auth: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini_model: "gemini-2.5-flash".into(),
            tutor_model: "gemini-1.5-flash".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com".into(),
            database_url: "https://studymate-e2268-default-rtdb.firebaseio.com".into(),
            allowed_origin: "http://localhost:3000".into(),
            max_upload_bytes: 20 * 1024 * 1024,
            gemini_api_key: None,
            database_auth: None,
        }
    }
}

impl Config {
    pub fn from(root: &Path) -> StudyResult<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config: Config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        self.gemini_api_key = non_empty("GEMINI_API_KEY");
        self.database_auth = non_empty("STUDYMATE_DATABASE_AUTH");
        if let Some(url) = non_empty("STUDYMATE_DATABASE_URL") {
            self.database_url = url;
        }
    }

    pub fn gemini_model(&self) -> &str {
        &self.gemini_model
    }

    pub fn tutor_model(&self) -> &str {
        &self.tutor_model
    }

    pub fn gemini_base_url(&self) -> &str {
        self.gemini_base_url.trim_end_matches('/')
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini_api_key.as_deref()
    }

    pub fn database_url(&self) -> &str {
        self.database_url.trim_end_matches('/')
    }

    pub fn database_auth(&self) -> Option<&str> {
        self.database_auth.as_deref()
    }

    pub fn allowed_origin(&self) -> &str {
        &self.allowed_origin
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }
}

/// First characters of a secret, safe to print.
pub fn mask(secret: &str) -> String {
    format!("{}********", secret.chars().take(6).collect::<String>())
}

pub fn get_config(root: &str) -> Result<(PathBuf, Config),String> {
	let path = root.to_string();
	let root = std::fs::canonicalize(&path)
		.map_err(|_| format!("Could not find studymate root: {}\n", path))?;

	match dotenv::from_path(root.join(".env")) {
		Ok(_) => info!("Loaded environment from {:?}", root.join(".env")),
		Err(e) if e.not_found() => (),
		Err(e) => return Err(format!("Could not read .env file: {}\n", e)),
	}

	let config = Config::from(&root)
		.map_err(|e| format!("Could not import {} file: {}\n", CONFIG_FILE, e))?;
	match config.gemini_api_key() {
		Some(key) => info!("GEMINI_API_KEY loaded: {}", mask(key)),
		None => error!("GEMINI_API_KEY is missing, quiz generation and tutoring will fail"),
	}
	Ok((root, config))
}
