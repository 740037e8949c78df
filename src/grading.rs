//! Grading of generated quizzes.
//!
//! The answer key of a generated question is loosely shaped: it may carry an
//! explicit index (zero- or one-based), a letter such as `"B"`, the literal
//! option text or that text behind a label like `"C) ..."`. Resolution never
//! fails loudly: an answer that cannot be mapped onto an option resolves to
//! `None` and simply never scores.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Question index -> selected option index.
pub type AnswerMap = BTreeMap<usize, usize>;

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[a-d]\s*[.)]\s*").expect("label pattern")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    answer: String,
    #[serde(default, deserialize_with = "lenient_index", skip_serializing_if = "Option::is_none")]
    answer_index: Option<i64>,
}

#[cfg(test)]
impl Question {
    pub fn new(question: &str, options: &[&str], answer: &str) -> Self {
        Question {
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer: answer.into(),
            answer_index: None,
        }
    }

    pub fn with_answer_index(mut self, index: i64) -> Self {
        self.answer_index = Some(index);
        self
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn answer_index(&self) -> Option<i64> {
        self.answer_index
    }
}

impl Question {
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    })
}

/// Canonical form of an option or answer text used for comparisons.
pub fn normalize(s: &str) -> String {
    let mut rest = s;
    while let Some(label) = LABEL.find(rest) {
        rest = &rest[label.end()..];
    }
    rest.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Maps an answer of the form `C`, `c.`, `C)` or `C: ...` to its index.
pub fn letter_to_index(answer: &str) -> Option<usize> {
    let mut chars = answer.trim().chars();
    let index = match chars.next()?.to_ascii_uppercase() {
        c @ 'A'..='D' => c as usize - 'A' as usize,
        _ => return None,
    };
    match chars.next() {
        None | Some('.') | Some(')') | Some(':') => Some(index),
        _ => None,
    }
}

pub fn resolve_correct_index(question: &Question) -> Option<usize> {
    let n = question.options.len();
    if n == 0 {
        return None;
    }

    if let Some(index) = question.answer_index {
        if (0..n as i64).contains(&index) {
            return Some(index as usize);
        }
        if (1..=n as i64).contains(&index) {
            return Some(index as usize - 1);
        }
    }

    if let Some(index) = letter_to_index(&question.answer).filter(|i| *i < n) {
        return Some(index);
    }

    let answer = normalize(&question.answer);
    let options: Vec<String> = question.options.iter().map(|o| normalize(o)).collect();
    if let Some(index) = options.iter().position(|o| *o == answer) {
        return Some(index);
    }
    if answer.is_empty() {
        return None;
    }
    options.iter().position(|o| o.contains(&answer))
}

pub fn is_correct(question: &Question, selected: Option<usize>) -> bool {
    match (selected, resolve_correct_index(question)) {
        (Some(selected), Some(correct)) => selected == correct,
        _ => false,
    }
}

pub fn compute_score(questions: &[Question], answers: &AnswerMap) -> usize {
    questions.iter()
        .enumerate()
        .filter(|(i, q)| is_correct(q, answers.get(i).copied()))
        .count()
}

/// Indices of questions whose answer key matches none of their options.
pub fn unresolved(questions: &[Question]) -> Vec<usize> {
    questions.iter()
        .enumerate()
        .filter(|(_, q)| resolve_correct_index(q).is_none())
        .map(|(i, _)| i)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub question: String,
    pub selected: Option<usize>,
    /// `-1` when the answer key could not be resolved.
    pub correct_index: i64,
    pub correct: bool,
}

pub fn review(questions: &[Question], answers: &AnswerMap) -> Vec<QuestionReview> {
    questions.iter()
        .enumerate()
        .map(|(i, q)| {
            let selected = answers.get(&i).copied();
            QuestionReview {
                question: q.question.clone(),
                selected,
                correct_index: resolve_correct_index(q).map_or(-1, |c| c as i64),
                correct: is_correct(q, selected),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(options: &[&str], answer: &str) -> Question {
        Question::new("q", options, answer)
    }

    #[test]
    fn normalize_strips_leading_label_only() {
        assert_eq!(normalize("B) Paris"), "paris");
        assert_eq!(normalize("Paris B)"), "paris b)");
        assert_eq!(normalize("  c .   New   York "), "new york");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in ["A. B. x", "a) b) C) d", " D)  Lille\t", "Paris", "b.", "E) no label", "  ", "A.B.c"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input {:?}", s);
        }
    }

    #[test]
    fn letters_need_to_stand_alone() {
        assert_eq!(letter_to_index("C"), Some(2));
        assert_eq!(letter_to_index(" c) Nice"), Some(2));
        assert_eq!(letter_to_index("a."), Some(0));
        assert_eq!(letter_to_index("D: Lille"), Some(3));
        assert_eq!(letter_to_index("banana"), None);
        assert_eq!(letter_to_index("E"), None);
        assert_eq!(letter_to_index(""), None);
    }

    #[test]
    fn answer_index_wins_over_text() {
        let question = q(&["x", "y", "z"], "z").with_answer_index(1);
        assert_eq!(resolve_correct_index(&question), Some(1));
    }

    #[test]
    fn one_based_answer_index_fallback() {
        let question = q(&["x", "y", "z"], "").with_answer_index(3);
        assert_eq!(resolve_correct_index(&question), Some(2));
        let question = q(&["x", "y", "z"], "x").with_answer_index(4);
        assert_eq!(resolve_correct_index(&question), Some(0));
        let question = q(&["x", "y", "z"], "y").with_answer_index(-1);
        assert_eq!(resolve_correct_index(&question), Some(1));
    }

    #[test]
    fn letter_fallback() {
        let question = q(&["Paris", "Lyon", "Nice", "Lille"], "C");
        assert_eq!(resolve_correct_index(&question), Some(2));
        // letter past the end of a short option list falls through to text
        let question = q(&["D", "x"], "D");
        assert_eq!(resolve_correct_index(&question), Some(0));
    }

    #[test]
    fn exact_text_fallback_ignores_labels() {
        let question = q(&["A. Paris", "B. Lyon"], "Lyon");
        assert_eq!(resolve_correct_index(&question), Some(1));
    }

    #[test]
    fn substring_fallback() {
        let question = q(&["Paris, France", "Lyon"], "Paris");
        assert_eq!(resolve_correct_index(&question), Some(0));
    }

    #[test]
    fn first_match_wins_for_duplicates() {
        let question = q(&["Lyon", "Paris", "paris"], "PARIS");
        assert_eq!(resolve_correct_index(&question), Some(1));
    }

    #[test]
    fn unresolvable_answers() {
        let question = q(&["x", "y"], "banana");
        assert_eq!(resolve_correct_index(&question), None);
        assert_eq!(resolve_correct_index(&q(&[], "A")), None);
        assert_eq!(resolve_correct_index(&q(&["x", "y"], "  ")), None);
    }

    #[test]
    fn unresolvable_never_scores() {
        let quiz = vec![q(&["x", "y"], "banana")];
        assert_eq!(compute_score(&quiz, &AnswerMap::new()), 0);
        for option in 0..2 {
            assert_eq!(compute_score(&quiz, &AnswerMap::from([(0, option)])), 0);
        }
        assert_eq!(unresolved(&quiz), vec![0]);
    }

    #[test]
    fn end_to_end_score() {
        let quiz = vec![
            q(&["a", "b", "c"], "a"),
            q(&["a", "b", "c"], "C"),
            q(&["a", "b", "c"], "").with_answer_index(1),
        ];
        let answers = AnswerMap::from([(0, 0), (1, 2), (2, 0)]);
        assert_eq!(compute_score(&quiz, &answers), 2);
    }

    #[test]
    fn score_is_monotone_and_overwrites() {
        let quiz = vec![q(&["a", "b"], "a"), q(&["a", "b"], "b")];
        let mut answers = AnswerMap::new();
        answers.insert(0, 0);
        assert_eq!(compute_score(&quiz, &answers), 1);
        answers.insert(1, 1);
        assert_eq!(compute_score(&quiz, &answers), 2);
        answers.insert(0, 0);
        assert_eq!(compute_score(&quiz, &answers), 2);
        answers.insert(0, 1);
        assert_eq!(compute_score(&quiz, &answers), 1);
    }

    #[test]
    fn answers_outside_the_quiz_are_ignored() {
        let quiz = vec![q(&["a", "b"], "a")];
        let answers = AnswerMap::from([(0, 0), (5, 0)]);
        assert_eq!(compute_score(&quiz, &answers), 1);
    }

    #[test]
    fn review_reports_sentinel() {
        let quiz = vec![q(&["a", "b"], "b"), q(&["a"], "zzz")];
        let reviews = review(&quiz, &AnswerMap::from([(0, 1)]));
        assert_eq!(reviews[0].correct_index, 1);
        assert!(reviews[0].correct);
        assert_eq!(reviews[1].correct_index, -1);
        assert_eq!(reviews[1].selected, None);
        assert!(!reviews[1].correct);
    }

    #[test]
    fn lenient_deserialization() {
        let quiz: Vec<Question> = serde_json::from_str(r#"[
            {"question": "one", "options": ["a", "b"], "answer": 2},
            {"question": "two", "options": ["a", "b"], "answer": null, "answerIndex": 1.0},
            {"question": "three", "options": ["a", "b"], "answer": "a", "answerIndex": "1"},
            {"question": "four", "answerIndex": 1.5}
        ]"#).unwrap();
        assert_eq!(quiz[0].answer(), "2");
        assert_eq!(quiz[1].answer_index(), Some(1));
        assert_eq!(quiz[2].answer_index(), None);
        assert_eq!(quiz[3].answer_index(), None);
        assert!(quiz[3].options().is_empty());
        assert_eq!(resolve_correct_index(&quiz[3]), None);
    }
}
