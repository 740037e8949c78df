//! Stored quiz results and to-dos, and the dashboard views computed from them.

use std::collections::BTreeMap;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizResultRecord {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<usize>,
    pub submitted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_submitted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_submitted: Option<String>,
}

impl QuizResultRecord {
    /// Record of a graded quiz session, stamped with UTC and IST times.
    pub fn graded(user_id: &str, email: &str, quiz_id: Option<String>, score: usize, total: usize, now: DateTime<Utc>) -> Self {
        let ist = now.with_timezone(&ist());
        QuizResultRecord {
            user_id: user_id.into(),
            email: email.into(),
            quiz_id,
            score: score as f64,
            total_questions: Some(total),
            submitted_at: iso_timestamp(now),
            date_submitted: Some(ist.format("%d/%m/%Y").to_string()),
            time_submitted: Some(ist.format("%H:%M:%S").to_string()),
        }
    }
}

fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset in range")
}

/// Millisecond precision UTC timestamp, e.g. `2025-11-07T04:15:32.123Z`.
pub fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Children of a database node in key order, skipping entries that do not parse.
pub fn children<T: serde::de::DeserializeOwned>(node: Option<BTreeMap<String, Value>>) -> Vec<(String, T)> {
    node.unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(child) => Some((key, child)),
            Err(e) => {
                warn!("Skipping malformed entry {}: {}", key, e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub id: String,
    pub description: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub overall_score: i64,
    pub quiz_scores: Vec<f64>,
    pub recent_activities: Vec<Activity>,
    pub upcoming_reminders: Vec<Value>,
}

pub fn dashboard_stats(results: &[QuizResultRecord]) -> DashboardStats {
    let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
    let overall_score = match scores.len() {
        0 => 0,
        n => (scores.iter().sum::<f64>() / n as f64).round() as i64,
    };
    DashboardStats {
        overall_score,
        quiz_scores: scores[scores.len().saturating_sub(5)..].to_vec(),
        recent_activities: results.iter()
            .rev()
            .take(3)
            .map(|r| Activity {
                id: r.submitted_at.clone(),
                description: format!("Scored {}% on quiz {}", r.score, r.quiz_id.as_deref().unwrap_or("N/A")),
                timestamp: r.submitted_at.clone(),
            })
            .collect(),
        upcoming_reminders: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestScore {
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

pub fn latest_score(results: &[QuizResultRecord]) -> LatestScore {
    let mut latest: Option<&QuizResultRecord> = None;
    for result in results {
        let newer = match latest {
            None => true,
            Some(current) => parse_time(&result.submitted_at) > parse_time(&current.submitted_at),
        };
        if newer {
            latest = Some(result);
        }
    }
    LatestScore {
        score: latest.map(|r| r.score),
        submitted_at: latest.map(|r| r.submitted_at.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub subject_averages: BTreeMap<String, f64>,
    pub strongest: (String, f64),
    pub weakest: (String, f64),
}

pub fn subject(quiz_id: Option<&str>) -> &str {
    match quiz_id {
        Some(id) if id.contains('_') => id.split('_').next().unwrap_or("General"),
        _ => "General",
    }
}

pub fn progress(results: &[QuizResultRecord]) -> Option<Progress> {
    let mut subjects: Vec<(&str, Vec<f64>)> = Vec::new();
    for result in results {
        let name = subject(result.quiz_id.as_deref());
        match subjects.iter_mut().find(|(s, _)| *s == name) {
            Some((_, scores)) => scores.push(result.score),
            None => subjects.push((name, vec![result.score])),
        }
    }

    let mut averages: Vec<(String, f64)> = subjects.into_iter()
        .map(|(s, scores)| (s.to_string(), scores.iter().sum::<f64>() / scores.len() as f64))
        .collect();
    averages.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    Some(Progress {
        strongest: averages.first()?.clone(),
        weakest: averages.last()?.clone(),
        subject_averages: averages.into_iter().collect(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoRecord {
    pub task: String,
    pub completed: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TodoRecord {
    pub fn new(task: &str, now: DateTime<Utc>) -> Self {
        TodoRecord {
            task: task.into(),
            completed: false,
            created_at: iso_timestamp(now),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Todo {
    pub id: String,
    #[serde(flatten)]
    pub record: TodoRecord,
}

/// To-dos with the most recently created first.
pub fn sorted_todos(children: Vec<(String, TodoRecord)>) -> Vec<Todo> {
    let mut tasks: Vec<Todo> = children.into_iter()
        .map(|(id, record)| Todo{ id, record })
        .collect();
    tasks.sort_by(|a, b| parse_time(&b.record.created_at).cmp(&parse_time(&a.record.created_at)));
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn result(quiz_id: Option<&str>, score: f64, submitted_at: &str) -> QuizResultRecord {
        QuizResultRecord {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            quiz_id: quiz_id.map(|q| q.to_string()),
            score,
            submitted_at: submitted_at.into(),
            ..Default::default()
        }
    }

    #[test]
    fn graded_record_carries_ist_fields() {
        let now = Utc.with_ymd_and_hms(2025, 11, 7, 20, 15, 32).unwrap();
        let record = QuizResultRecord::graded("u1", "a@b.c", Some("quiz1".into()), 3, 5, now);
        assert_eq!(record.submitted_at, "2025-11-07T20:15:32.000Z");
        assert_eq!(record.date_submitted.as_deref(), Some("08/11/2025"));
        assert_eq!(record.time_submitted.as_deref(), Some("01:45:32"));
        assert_eq!(record.total_questions, Some(5));

        let stored = serde_json::to_value(&record).unwrap();
        assert_eq!(stored["totalQuestions"], json!(5));
        assert_eq!(stored["quizId"], json!("quiz1"));
    }

    #[test]
    fn empty_dashboard() {
        let stats = dashboard_stats(&[]);
        assert_eq!(stats.overall_score, 0);
        assert!(stats.quiz_scores.is_empty());
        assert!(stats.recent_activities.is_empty());
    }

    #[test]
    fn dashboard_uses_latest_entries() {
        let results: Vec<_> = (1..=7)
            .map(|i| result(if i == 7 { None } else { Some("quiz1") }, i as f64, &format!("t{}", i)))
            .collect();
        let stats = dashboard_stats(&results);
        assert_eq!(stats.overall_score, 4);
        assert_eq!(stats.quiz_scores, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        let ids: Vec<_> = stats.recent_activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["t7", "t6", "t5"]);
        assert_eq!(stats.recent_activities[0].description, "Scored 7% on quiz N/A");
        assert_eq!(stats.recent_activities[1].description, "Scored 6% on quiz quiz1");
    }

    #[test]
    fn overall_score_rounds() {
        let results = vec![result(None, 1.0, ""), result(None, 2.0, "")];
        assert_eq!(dashboard_stats(&results).overall_score, 2);
    }

    #[test]
    fn latest_score_by_submission_time() {
        assert_eq!(latest_score(&[]), LatestScore{ score: None, submitted_at: None });

        let results = vec![
            result(None, 1.0, "2025-11-07T09:00:00.000Z"),
            result(None, 2.0, "2025-11-08T09:00:00.000Z"),
            result(None, 3.0, "not a date"),
            result(None, 4.0, "2025-11-06T09:00:00.000Z"),
        ];
        let latest = latest_score(&results);
        assert_eq!(latest.score, Some(2.0));
        assert_eq!(latest.submitted_at.as_deref(), Some("2025-11-08T09:00:00.000Z"));
    }

    #[test]
    fn progress_groups_by_subject() {
        assert_eq!(progress(&[]), None);

        let results = vec![
            result(Some("math_quiz1"), 4.0, ""),
            result(Some("math_quiz2"), 2.0, ""),
            result(Some("quiz1"), 5.0, ""),
            result(Some("bio_1"), 1.0, ""),
        ];
        let progress = progress(&results).unwrap();
        assert_eq!(progress.subject_averages["math"], 3.0);
        assert_eq!(progress.subject_averages["General"], 5.0);
        assert_eq!(progress.strongest, ("General".to_string(), 5.0));
        assert_eq!(progress.weakest, ("bio".to_string(), 1.0));
    }

    #[test]
    fn malformed_children_are_skipped() {
        let node: BTreeMap<String, Value> = serde_json::from_value(json!({
            "-b": { "task": "second", "completed": true, "createdAt": "2025-11-08T09:00:00.000Z" },
            "-a": { "task": "first", "createdAt": "2025-11-07T09:00:00.000Z" },
            "-c": "garbage"
        })).unwrap();
        let todos = sorted_todos(children(Some(node)));
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].id, "-b");
        assert_eq!(todos[1].record.task, "first");
        assert!(!todos[1].record.completed);

        let listed = serde_json::to_value(&todos[0]).unwrap();
        assert_eq!(listed, json!({ "id": "-b", "task": "second", "completed": true, "createdAt": "2025-11-08T09:00:00.000Z" }));
    }
}
