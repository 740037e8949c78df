mod session;
mod owner;
mod service;

pub use session::{FinalScore, QuizSession, ScoreCard, SessionStatus, SessionSummary, SessionView};
pub use service::SessionService;

use tokio::sync::mpsc::channel;

pub fn create_session_state() -> SessionService {
    let (job_sender, job_receiver) = channel(1000);

    owner::create_session_state(job_receiver);

    SessionService::new(job_sender)
}
