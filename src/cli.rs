#[macro_use]
mod print;
mod command;

use clap::{Parser, Subcommand};
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::server::App;

/// Operator console of the running server.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true, infer_subcommands = true)]
struct Console {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ConsoleCommand {
    /// Lists the quiz sessions of all users.
    Sessions,
    /// Shows the answers of one user's quiz, question by question.
    Session {
        /// Id of the user.
        user: String,
    },
    /// Checks the connection to the language model.
    Ping,
    /// Closes the server.
    Exit,
}

fn parse(line: &str) -> Result<ConsoleCommand, String> {
    Console::try_parse_from(line.split_whitespace())
        .map(|console| console.command)
        .map_err(|e| e.render().to_string())
}

pub async fn start(app: App) {
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        command_prefix!();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                println!("Could not read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Ok(ConsoleCommand::Exit)          => break,
            Ok(ConsoleCommand::Sessions)      => command::sessions(app.sessions()).await,
            Ok(ConsoleCommand::Session{user}) => command::session(app.sessions(), &user).await,
            Ok(ConsoleCommand::Ping)          => command::ping(&app).await,
            Err(e) => println!("{}", e),
        }
    }
    println!("Closing server...");
}
