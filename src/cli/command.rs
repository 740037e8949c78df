use tabular::{Row, Table};

use crate::gemini::GREETING_PROMPT;
use crate::server::App;
use crate::state::SessionService;


pub async fn sessions(sessions: &SessionService) {
    let summaries = sessions.summaries().await;
    if summaries.is_empty() {
        println!("No quiz sessions yet.");
        return;
    }
    let mut table = Table::new("\t{:<}  {:<}  {:>}/{:<}  {:>}");
    table.add_row(Row::new()
        .with_cell("User")
        .with_cell("Status")
        .with_cell("Answered")
        .with_cell("Total")
        .with_cell("Score"));
    for summary in summaries {
        table.add_row(Row::new()
            .with_cell(summary.user)
            .with_cell(summary.status)
            .with_cell(summary.answered)
            .with_cell(summary.total)
            .with_cell(summary.score));
    }
    println!("{}", table);
}

pub async fn session(sessions: &SessionService, user: &str) {
    let view = match sessions.view(user).await {
        Some(view) => view,
        None => {
            println!("No quiz session for {}", user);
            return;
        }
    };
    let mut table = Table::new("\t{:>}: {:<}  {:^}  {:^}  {:<}")
        .with_heading(format!("user: {}", user))
        .with_heading(format!("status: {}\nscore: {}/{}", view.status, view.score, view.total));
    table.add_row(Row::new()
        .with_cell("#")
        .with_cell("Question")
        .with_cell("Selected")
        .with_cell("Correct")
        .with_cell(""));
    for (i, review) in view.review.iter().enumerate() {
        let selected = review.selected.map_or("-".to_string(), |s| s.to_string());
        let (correct, note) = match review.correct_index {
            -1 => ("?".to_string(), "answer key matches no option"),
            c if review.correct => (c.to_string(), "correct"),
            c => (c.to_string(), ""),
        };
        table.add_row(Row::new()
            .with_cell(i)
            .with_cell(review.question.replace("\n", " "))
            .with_cell(selected)
            .with_cell(correct)
            .with_cell(note));
    }
    println!("{}", table);
}

pub async fn ping(app: &App) {
    println!("Asking {} for a greeting...", app.quiz_model().model());
    match app.quiz_model().generate(GREETING_PROMPT).await {
        Ok(reply) => println!("{}", reply.trim()),
        Err(e) => println!("Gemini test failed: {}", e),
    }
}
