use tokio::sync::mpsc::{error::TrySendError, Sender};
use tokio::sync::oneshot::{self, Sender as Return};

use crate::error::{Error, StudyResult};
use crate::grading::Question;

use super::{FinalScore, ScoreCard, SessionSummary, SessionView};

pub enum SessionJob {
    BeginGeneration(String, Return<bool>),
    EndGeneration(String),
    Load(String, Vec<Question>),
    Select(String, usize, usize, Return<StudyResult<ScoreCard>>),
    Reset(String),
    Finish(String, Return<StudyResult<FinalScore>>),
    MarkSubmitted(String, FinalScore, Return<bool>),
    AbortSubmit(String, FinalScore),
    View(String, Return<Option<SessionView>>),
    Summaries(Return<Vec<SessionSummary>>),
}

#[derive(Debug, Clone)]
pub struct SessionService {
    job_channel: Sender<SessionJob>,
}

impl SessionService {
    pub(super) fn new(job_channel: Sender<SessionJob>) -> Self {
        SessionService { job_channel }
    }

    /// Claims the user's generation slot for the lifetime of the returned guard.
    pub async fn begin_generation(&self, user: &str) -> StudyResult<GenerationGuard> {
        let (send, recv) = oneshot::channel();
        self.job_channel.send(SessionJob::BeginGeneration(user.into(), send)).await.expect("Send failed");
        if recv.await.expect("Receive failed") {
            Ok(GenerationGuard { job_channel: self.job_channel.clone(), user: user.into() })
        } else {
            Err(Error::Conflict("A quiz is already being generated".into()))
        }
    }

    pub async fn load(&self, user: &str, quiz: Vec<Question>) {
        self.job_channel.send(SessionJob::Load(user.into(), quiz)).await.expect("Send failed");
    }

    pub async fn select(&self, user: &str, question: usize, option: usize) -> StudyResult<ScoreCard> {
        let (send, recv) = oneshot::channel();
        self.job_channel.send(SessionJob::Select(user.into(), question, option, send)).await.expect("Send failed");
        recv.await.expect("Receive failed")
    }

    pub async fn reset(&self, user: &str) {
        self.job_channel.send(SessionJob::Reset(user.into())).await.expect("Send failed");
    }

    pub async fn finish(&self, user: &str) -> StudyResult<FinalScore> {
        let (send, recv) = oneshot::channel();
        self.job_channel.send(SessionJob::Finish(user.into(), send)).await.expect("Send failed");
        recv.await.expect("Receive failed")
    }

    pub async fn mark_submitted(&self, user: &str, final_score: FinalScore) -> bool {
        let (send, recv) = oneshot::channel();
        self.job_channel.send(SessionJob::MarkSubmitted(user.into(), final_score, send)).await.expect("Send failed");
        recv.await.expect("Receive failed")
    }

    pub async fn abort_submit(&self, user: &str, final_score: FinalScore) {
        self.job_channel.send(SessionJob::AbortSubmit(user.into(), final_score)).await.expect("Send failed");
    }

    pub async fn view(&self, user: &str) -> Option<SessionView> {
        let (send, recv) = oneshot::channel();
        self.job_channel.send(SessionJob::View(user.into(), send)).await.expect("Send failed");
        recv.await.expect("Receive failed")
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let (send, recv) = oneshot::channel();
        self.job_channel.send(SessionJob::Summaries(send)).await.expect("Send failed");
        recv.await.expect("Receive failed")
    }
}

/// Releases the generation slot on every exit path of a generate request.
#[derive(Debug)]
pub struct GenerationGuard {
    job_channel: Sender<SessionJob>,
    user: String,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let job = SessionJob::EndGeneration(std::mem::take(&mut self.user));
        if let Err(TrySendError::Full(job)) = self.job_channel.try_send(job) {
            let job_channel = self.job_channel.clone();
            tokio::task::spawn(async move {
                let _ = job_channel.send(job).await;
            });
        }
    }
}
