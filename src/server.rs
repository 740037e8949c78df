mod api;
mod listener;
mod serve;
mod tutor;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::error::StudyResult;
use crate::gemini::GeminiClient;
use crate::state::SessionService;

pub use listener::Surface;

/// Everything a request handler needs, cheap to clone per connection.
#[derive(Debug, Clone)]
pub struct App {
    root: PathBuf,
    config: Arc<Config>,
    quiz_model: GeminiClient,
    tutor_model: GeminiClient,
    database: Database,
    sessions: SessionService,
}

impl App {
    pub fn new(root: PathBuf, config: Config, sessions: SessionService) -> StudyResult<Self> {
        Ok(App {
            quiz_model: GeminiClient::new(&config, config.gemini_model())?,
            tutor_model: GeminiClient::new(&config, config.tutor_model())?,
            database: Database::new(&config)?,
            config: Arc::new(config),
            root,
            sessions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn quiz_model(&self) -> &GeminiClient {
        &self.quiz_model
    }

    pub fn tutor_model(&self) -> &GeminiClient {
        &self.tutor_model
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }
}

pub fn get_socket(ip: Option<String>, port: u16) -> Result<SocketAddr,String> {
	let ip = match ip {
		None => local_ipaddress::get()
			.ok_or("Could not retrieve local ip address\n".to_string())?,
		Some(ip) if ip == "localhost" => "127.0.0.1".into(),
		Some(ip) => ip,
	};
	let ip = ip.parse()
		.map_err(|_| format!("Could not parse ip address: {:?}", ip))?;
	Ok(SocketAddr::new(ip,port))
}

pub async fn start(app: &App, socket: SocketAddr, surface: Surface) -> StudyResult<()> {
    listener::start(app, socket, surface).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockets() {
        assert_eq!(get_socket(Some("localhost".into()), 3001).unwrap(), "127.0.0.1:3001".parse().unwrap());
        assert_eq!(get_socket(Some("::1".into()), 3002).unwrap(), "[::1]:3002".parse().unwrap());
        assert!(get_socket(Some("not-an-ip".into()), 80).is_err());
    }
}
