use hyper::body::Incoming;
use hyper::server::conn::http1::Builder as ConnectionBuilder;
use hyper::{Method, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::pin::pin;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use crate::error::StudyResult;

use super::serve::{self, Body, Cors};
use super::{api, tutor, App};

/// The two HTTP services run by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Api,
    Tutor,
}

pub async fn start(app: &App, socket: SocketAddr, surface: Surface) -> StudyResult<()> {
    let listener = TcpListener::bind(socket).await?;
    info!("{:?} service listening on http://{}", surface, socket);
    let app = app.clone();
    tokio::task::spawn(async move {
        handle_requests(app, surface, listener).await;
    });
    Ok(())
}

async fn handle_requests(app: App, surface: Surface, listener: TcpListener) {
    loop {
        let (tcp, remote_address) = match listener.accept().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Could not accept connection: {}", e);
                continue;
            }
        };
        debug!("Accepted connection from {:?}", remote_address);
        let io = TokioIo::new(tcp);

        let app_clone = app.clone();
        tokio::task::spawn(async move {
            let service = hyper::service::service_fn(|req| {
                let app = app_clone.clone();
                main_service(app, surface, req)
            });

            let conn = ConnectionBuilder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service);
            let connection = pin!(conn);

            if let Err(e) = connection.await {
                debug!("Connection error: {}", e);
            }
        });
    }
}

async fn main_service(
    app: App,
    surface: Surface,
    req: http::Request<Incoming>
)
-> StudyResult<Response<Body>>
{
    let (parts, incoming) = req.into_parts();
    info!("{} {}", parts.method, parts.uri.path());

    let response = match (surface, parts.method.clone()) {
        (_, Method::OPTIONS) => serve::no_content(),
        (Surface::Api, _) => api::route(&app, &parts, incoming).await,
        (Surface::Tutor, _) => tutor::route(&app, &parts, incoming).await,
    };
    let response = match response {
        Ok(response) => response,
        Err(e) => serve::error_response(&e)?,
    };

    let cors = match surface {
        Surface::Api => Cors::Origin(app.config().allowed_origin()),
        Surface::Tutor => Cors::Any,
    };
    Ok(serve::with_cors(response, cors))
}
