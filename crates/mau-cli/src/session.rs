use std::io::Write;

use anyhow::Result;
use console::style;
use futures::StreamExt;
use mau::conversation::Conversation;
use mau::errors::MauError;

const SEPARATOR_WIDTH: usize = 80;

/// How a session stopped
#[derive(Debug)]
pub enum SessionOutcome {
    /// The conversation ended on its own
    Finished,
    /// The configured turn limit was reached
    TurnLimit,
    /// Ctrl-C abandoned the turn in progress
    Interrupted,
    /// A backend failed during a turn
    Failed(MauError),
}

/// Drives a conversation to its end, rendering every turn as it streams in
pub struct Session<W: Write> {
    conversation: Conversation,
    max_turns: Option<usize>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(conversation: Conversation, max_turns: Option<usize>, out: W) -> Self {
        Session {
            conversation,
            max_turns,
            out,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub async fn run(&mut self) -> Result<SessionOutcome> {
        writeln!(self.out, "{}\n", style("=== Conversation Started ===").bold())?;

        let mut turns = 0;
        let outcome = loop {
            if self.max_turns.is_some_and(|max| turns >= max) {
                break SessionOutcome::TurnLimit;
            }
            let Some(mut turn) = self.conversation.next_turn() else {
                break SessionOutcome::Finished;
            };
            turns += 1;

            write!(self.out, "{} ", style(format!("{}:", turn.speaker)).bold())?;
            self.out.flush()?;

            let interrupt = tokio::signal::ctrl_c();
            tokio::pin!(interrupt);

            let stopped = loop {
                tokio::select! {
                    fragment = turn.fragments.next() => {
                        match fragment {
                            Some(Ok(fragment)) => {
                                write!(self.out, "{}", fragment)?;
                                self.out.flush()?;
                            }
                            Some(Err(e)) => break Some(SessionOutcome::Failed(e)),
                            None => break None,
                        }
                    }
                    _ = &mut interrupt => {
                        break Some(SessionOutcome::Interrupted);
                    }
                }
            };
            drop(turn);

            writeln!(self.out, "\n{}", "-".repeat(SEPARATOR_WIDTH))?;
            if let Some(outcome) = stopped {
                break outcome;
            }
        };

        match &outcome {
            SessionOutcome::Interrupted => {
                writeln!(self.out, "\n{}", style("Conversation interrupted by user.").yellow())?;
            }
            SessionOutcome::Failed(e) => {
                writeln!(self.out, "\n{} {}", style("Error:").red().bold(), e)?;
            }
            SessionOutcome::TurnLimit => {
                tracing::info!(turns, "turn limit reached");
            }
            SessionOutcome::Finished => {}
        }

        writeln!(self.out, "\n{}", style("=== Conversation Ended ===").bold())?;
        Ok(outcome)
    }
}
