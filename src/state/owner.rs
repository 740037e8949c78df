use std::collections::HashMap;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, info};

use crate::error::{Error, StudyResult};
use crate::grading::Question;

use super::{service::SessionJob, FinalScore, QuizSession, ScoreCard, SessionStatus, SessionSummary, SessionView};

pub(super) fn create_session_state(job_receiver: Receiver<SessionJob>) {
    tokio::task::spawn(async move {
        let owner = SessionOwner {
            sessions: HashMap::new(),
        };

        owner.handle_jobs(job_receiver).await
    });
}

#[derive(Debug)]
struct SessionOwner {
    sessions: HashMap<String, QuizSession>,
}

impl SessionOwner {
    async fn handle_jobs(mut self, mut job_receiver: Receiver<SessionJob>) {
        while let Some(job) = job_receiver.recv().await {
            // a requester that went away does not need its reply
            match job {
                SessionJob::BeginGeneration(user, sender)            => { let _ = sender.send(self.begin_generation(user)); },
                SessionJob::EndGeneration(user)                      => self.end_generation(&user),
                SessionJob::Load(user, quiz)                         => self.load(user, quiz),
                SessionJob::Select(user, question, option, sender)   => { let _ = sender.send(self.select(&user, question, option)); },
                SessionJob::Reset(user)                              => self.reset(&user),
                SessionJob::Finish(user, sender)                     => { let _ = sender.send(self.finish(&user)); },
                SessionJob::MarkSubmitted(user, final_score, sender) => { let _ = sender.send(self.mark_submitted(&user, &final_score)); },
                SessionJob::AbortSubmit(user, final_score)           => self.abort_submit(&user, &final_score),
                SessionJob::View(user, sender)                       => { let _ = sender.send(self.view(&user)); },
                SessionJob::Summaries(sender)                        => { let _ = sender.send(self.summaries()); },
            }
        }
        debug!("Session channel closed");
    }

    fn session_mut(&mut self, user: &str) -> StudyResult<&mut QuizSession> {
        self.sessions.get_mut(user)
            .ok_or_else(|| Error::NotFound(format!("No quiz session for {}", user)))
    }

    fn begin_generation(&mut self, user: String) -> bool {
        self.sessions.entry(user).or_default().begin_generation()
    }

    fn end_generation(&mut self, user: &str) {
        if let Some(session) = self.sessions.get_mut(user) {
            session.end_generation();
        }
        self.drop_if_idle(user);
    }

    /// Forgets a session with no quiz and no generation running.
    fn drop_if_idle(&mut self, user: &str) {
        let idle = self.sessions.get(user)
            .is_some_and(|s| s.status() == SessionStatus::Empty && !s.is_generating());
        if idle {
            self.sessions.remove(user);
            debug!("Dropped idle session of {}", user);
        }
    }

    fn load(&mut self, user: String, quiz: Vec<Question>) {
        info!("Loaded quiz of {} questions for {}", quiz.len(), user);
        self.sessions.entry(user).or_default().load(quiz);
    }

    fn select(&mut self, user: &str, question: usize, option: usize) -> StudyResult<ScoreCard> {
        self.session_mut(user)?.select(question, option)
    }

    fn reset(&mut self, user: &str) {
        if let Some(session) = self.sessions.get_mut(user) {
            session.reset();
        }
        self.drop_if_idle(user);
    }

    fn finish(&mut self, user: &str) -> StudyResult<FinalScore> {
        self.session_mut(user)?.finish()
    }

    fn mark_submitted(&mut self, user: &str, final_score: &FinalScore) -> bool {
        self.sessions.get_mut(user)
            .map(|session| session.mark_submitted(final_score))
            .unwrap_or(false)
    }

    fn abort_submit(&mut self, user: &str, final_score: &FinalScore) {
        if let Some(session) = self.sessions.get_mut(user) {
            if session.abort_submit(final_score) {
                info!("Reopened quiz of {} after a failed submit", user);
            }
        }
    }

    fn view(&self, user: &str) -> Option<SessionView> {
        self.sessions.get(user).map(|session| session.view())
    }

    fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<_> = self.sessions.iter()
            .map(|(user, session)| session.summary(user))
            .collect();
        summaries.sort_by(|a, b| a.user.cmp(&b.user));
        summaries
    }
}
