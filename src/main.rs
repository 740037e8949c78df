mod cli;
mod config;
mod database;
mod error;
mod gemini;
mod grading;
mod pdf;
mod records;
mod server;
mod state;

use std::{net::SocketAddr, path::PathBuf};
use clap::Parser;
use tracing::{error, info};


/// Study assistant API: quiz generation and grading, tutoring, dashboard and to-dos
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct AppArgs {
    /// The root of the server, an optional studymate.config (json) and .env file are read from here.
    #[arg(name = "ROOT", default_value = ".")]
    root: String,
    /// The ip address to bind to: Ipv4, Ipv6 or localhost.
    #[arg(long = "ip")]
    ip: Option<String>,
    /// The port of the study API.
    #[arg(long = "port", default_value_t = 3001)]
    port: u16,
    /// The port of the tutor API.
    #[arg(long = "tutor-port", default_value_t = 3002)]
    tutor_port: u16,
}

fn init() -> Result<(PathBuf, config::Config, SocketAddr, SocketAddr),String> {
	let args = AppArgs::parse();

	let (root, config) = config::get_config(&args.root)?;
	Ok((
		root, config,
		server::get_socket(args.ip.clone(), args.port)?,
		server::get_socket(args.ip, args.tutor_port)?,
	))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .init();

    let (root, config, api_socket, tutor_socket) = match init() {
        Ok(setup) => setup,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    info!("Starting studymate server in: {:?}", root);

    let sessions = state::create_session_state();
    let app = match server::App::new(root, config, sessions) {
        Ok(app) => app,
        Err(e) => {
            error!("Could not set up clients: {}", e);
            return;
        }
    };

    for (socket, surface) in [(api_socket, server::Surface::Api), (tutor_socket, server::Surface::Tutor)] {
        if let Err(e) = server::start(&app, socket, surface).await {
            error!("Could not bind {}: {}", socket, e);
            return;
        }
    }
    cli::start(app).await;
}
