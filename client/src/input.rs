//! Console input for human players, with a local answer deadline

use crate::network::Player;
use shared::NO_ANSWER_TOKEN;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Forwards stdin lines into a channel so they can be awaited with a deadline
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = stdin.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}

/// A human at the terminal
pub struct ConsolePlayer {
    name: String,
    answer_timeout: Duration,
    lines: mpsc::UnboundedReceiver<String>,
}

impl ConsolePlayer {
    pub fn new(
        name: impl Into<String>,
        answer_timeout: Duration,
        lines: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            name: name.into(),
            answer_timeout,
            lines,
        }
    }
}

impl Player for ConsolePlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_message(&mut self, line: &str) {
        println!("{}", line);
    }

    fn answer(&mut self, _question: &str) -> impl Future<Output = String> + Send {
        async move {
            // Anything typed before the question was asked is stale
            while self.lines.try_recv().is_ok() {}

            println!("Please type in your answer:");
            match timeout(self.answer_timeout, self.lines.recv()).await {
                Ok(Some(line)) => line,
                Ok(None) => NO_ANSWER_TOKEN.to_string(),
                Err(_) => {
                    println!("Time is up! You did not answer in time.");
                    NO_ANSWER_TOKEN.to_string()
                }
            }
        }
    }
}
