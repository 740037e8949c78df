use serde::{Deserialize, Serialize};

use crate::error::{Error, StudyResult};
use crate::grading::{self, AnswerMap, Question, QuestionReview};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Empty,
    Loaded,
    Submitting,
    Submitted,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionStatus::Empty => f.write_str("empty"),
            SessionStatus::Loaded => f.write_str("in progress"),
            SessionStatus::Submitting => f.write_str("submitting"),
            SessionStatus::Submitted => f.write_str("submitted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreCard {
    pub score: usize,
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalScore {
    pub instance: u64,
    pub score: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: SessionStatus,
    pub quiz: Vec<Question>,
    pub answers: AnswerMap,
    pub score: usize,
    pub total: usize,
    pub review: Vec<QuestionReview>,
    pub unresolved: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub user: String,
    pub status: SessionStatus,
    pub answered: usize,
    pub total: usize,
    pub score: usize,
}

/// One user's quiz instance: `Empty` -> `Loaded` -> `Submitting` -> `Submitted`.
#[derive(Debug, Clone)]
pub struct QuizSession {
    status: SessionStatus,
    instance: u64,
    quiz: Vec<Question>,
    answers: AnswerMap,
    score: usize,
    generating: bool,
}

impl Default for QuizSession {
    fn default() -> Self {
        QuizSession {
            status: SessionStatus::Empty,
            instance: 0,
            quiz: Vec::new(),
            answers: AnswerMap::new(),
            score: 0,
            generating: false,
        }
    }
}

fn not_loaded(status: SessionStatus) -> Error {
    match status {
        SessionStatus::Empty => Error::Conflict("No quiz loaded".into()),
        SessionStatus::Submitting => Error::Conflict("Quiz is being submitted".into()),
        _ => Error::Conflict("Quiz already submitted".into()),
    }
}

impl QuizSession {
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Claims the generation slot; `false` when a generation is already running.
    pub fn begin_generation(&mut self) -> bool {
        !std::mem::replace(&mut self.generating, true)
    }

    pub fn end_generation(&mut self) {
        self.generating = false;
    }

    /// Starts a fresh quiz instance, dropping any previous answers.
    pub fn load(&mut self, quiz: Vec<Question>) {
        self.status = SessionStatus::Loaded;
        self.instance += 1;
        self.quiz = quiz;
        self.answers.clear();
        self.score = 0;
    }

    pub fn select(&mut self, question: usize, option: usize) -> StudyResult<ScoreCard> {
        if self.status != SessionStatus::Loaded {
            return Err(not_loaded(self.status));
        }
        let options = self.quiz.get(question)
            .map(|q| q.options().len())
            .ok_or_else(|| Error::bad_request(format!("No question {}", question)))?;
        if option >= options {
            return Err(Error::bad_request(format!("Question {} has no option {}", question, option)));
        }

        self.answers.insert(question, option);
        self.score = grading::compute_score(&self.quiz, &self.answers);
        Ok(self.score_card())
    }

    pub fn reset(&mut self) {
        self.status = SessionStatus::Empty;
        self.quiz.clear();
        self.answers.clear();
        self.score = 0;
    }

    /// Freezes the loaded quiz and returns its authoritative score, recomputed
    /// from scratch. Selections and further submits are refused until the
    /// submission is either marked or aborted.
    pub fn finish(&mut self) -> StudyResult<FinalScore> {
        if self.status != SessionStatus::Loaded {
            return Err(not_loaded(self.status));
        }
        self.status = SessionStatus::Submitting;
        self.score = grading::compute_score(&self.quiz, &self.answers);
        Ok(FinalScore {
            instance: self.instance,
            score: self.score,
            total: self.quiz.len(),
        })
    }

    fn is_submitting(&self, final_score: &FinalScore) -> bool {
        self.status == SessionStatus::Submitting && self.instance == final_score.instance
    }

    /// Moves the instance that was finished to `Submitted`. A quiz regenerated
    /// in the meantime is left alone.
    pub fn mark_submitted(&mut self, final_score: &FinalScore) -> bool {
        if self.is_submitting(final_score) {
            self.status = SessionStatus::Submitted;
            true
        } else { false }
    }

    /// Reopens the finished instance after its result could not be stored.
    pub fn abort_submit(&mut self, final_score: &FinalScore) -> bool {
        if self.is_submitting(final_score) {
            self.status = SessionStatus::Loaded;
            true
        } else { false }
    }

    pub fn score_card(&self) -> ScoreCard {
        ScoreCard {
            score: self.score,
            answered: self.answers.len(),
            total: self.quiz.len(),
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            status: self.status,
            quiz: self.quiz.clone(),
            answers: self.answers.clone(),
            score: self.score,
            total: self.quiz.len(),
            review: grading::review(&self.quiz, &self.answers),
            unresolved: grading::unresolved(&self.quiz),
        }
    }

    pub fn summary(&self, user: &str) -> SessionSummary {
        SessionSummary {
            user: user.into(),
            status: self.status,
            answered: self.answers.len(),
            total: self.quiz.len(),
            score: self.score,
        }
    }
}

#[cfg(test)]
impl QuizSession {
    pub fn score(&self) -> usize {
        self.score
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn quiz(&self) -> &[Question] {
        &self.quiz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> Vec<Question> {
        vec![
            Question::new("1", &["a", "b", "c"], "a"),
            Question::new("2", &["a", "b", "c"], "C"),
            Question::new("3", &["a", "b", "c"], "").with_answer_index(1),
        ]
    }

    #[test]
    fn select_needs_a_loaded_quiz() {
        let mut session = QuizSession::default();
        assert!(matches!(session.select(0, 0), Err(Error::Conflict(_))));
        assert!(matches!(session.finish(), Err(Error::Conflict(_))));
    }

    #[test]
    fn selections_overwrite_and_rescore() {
        let mut session = QuizSession::default();
        session.load(quiz());
        assert_eq!(session.select(0, 0).unwrap(), ScoreCard{ score: 1, answered: 1, total: 3 });
        assert_eq!(session.select(1, 2).unwrap().score, 2);
        assert_eq!(session.select(2, 0).unwrap().score, 2);
        assert_eq!(session.select(0, 1).unwrap(), ScoreCard{ score: 1, answered: 3, total: 3 });
    }

    #[test]
    fn out_of_range_selections_are_rejected() {
        let mut session = QuizSession::default();
        session.load(quiz());
        assert!(matches!(session.select(3, 0), Err(Error::BadRequest(_))));
        assert!(matches!(session.select(0, 3), Err(Error::BadRequest(_))));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn regenerate_starts_over() {
        let mut session = QuizSession::default();
        session.load(quiz());
        session.select(0, 0).unwrap();
        session.load(quiz());
        assert_eq!(session.status(), SessionStatus::Loaded);
        assert!(session.answers().is_empty());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn submit_is_terminal_until_the_next_quiz() {
        let mut session = QuizSession::default();
        session.load(quiz());
        session.select(0, 0).unwrap();
        session.select(1, 2).unwrap();
        let final_score = session.finish().unwrap();
        assert_eq!((final_score.score, final_score.total), (2, 3));
        assert!(session.mark_submitted(&final_score));
        assert_eq!(session.status(), SessionStatus::Submitted);
        assert!(session.select(2, 1).is_err());
        assert!(!session.mark_submitted(&final_score));

        session.load(quiz());
        assert_eq!(session.status(), SessionStatus::Loaded);
    }

    #[test]
    fn stale_submission_does_not_close_a_new_quiz() {
        let mut session = QuizSession::default();
        session.load(quiz());
        let final_score = session.finish().unwrap();
        session.load(quiz());
        assert!(!session.mark_submitted(&final_score));
        assert!(!session.abort_submit(&final_score));
        assert_eq!(session.status(), SessionStatus::Loaded);
    }

    #[test]
    fn submitting_freezes_the_answers() {
        let mut session = QuizSession::default();
        session.load(quiz());
        session.select(0, 0).unwrap();
        let final_score = session.finish().unwrap();
        assert_eq!(session.status(), SessionStatus::Submitting);
        assert!(matches!(session.finish(), Err(Error::Conflict(_))));
        assert!(matches!(session.select(0, 1), Err(Error::Conflict(_))));

        assert!(session.mark_submitted(&final_score));
        let view = session.view();
        assert_eq!(view.score, final_score.score);
        assert_eq!(view.score, view.review.iter().filter(|r| r.correct).count());
    }

    #[test]
    fn aborted_submit_reopens_the_quiz() {
        let mut session = QuizSession::default();
        session.load(quiz());
        session.select(0, 0).unwrap();
        let final_score = session.finish().unwrap();
        assert!(session.abort_submit(&final_score));
        assert_eq!(session.status(), SessionStatus::Loaded);
        assert_eq!(session.select(1, 2).unwrap().score, 2);
        assert!(!session.mark_submitted(&final_score));
        assert_eq!(session.finish().unwrap().score, 2);
    }

    #[test]
    fn reset_empties_the_session() {
        let mut session = QuizSession::default();
        session.load(quiz());
        session.select(0, 0).unwrap();
        session.reset();
        assert_eq!(session.status(), SessionStatus::Empty);
        assert!(session.quiz().is_empty());
        assert_eq!(session.score_card(), ScoreCard{ score: 0, answered: 0, total: 0 });
    }

    #[test]
    fn generation_slot_is_exclusive() {
        let mut session = QuizSession::default();
        assert!(session.begin_generation());
        assert!(!session.begin_generation());
        session.end_generation();
        assert!(session.begin_generation());
    }

    #[test]
    fn view_flags_unresolved_questions() {
        let mut session = QuizSession::default();
        session.load(vec![Question::new("1", &["x", "y"], "banana"), Question::new("2", &["x", "y"], "y")]);
        session.select(0, 0).unwrap();
        let view = session.view();
        assert_eq!(view.unresolved, vec![0]);
        assert_eq!(view.review[0].correct_index, -1);
        assert_eq!(view.score, 0);
    }
}
