//! Turn taking between two agents.
//!
//! A [`Conversation`] hands out one [`Turn`] at a time. Each turn borrows the
//! conversation mutably, so the next turn can only be requested once the caller
//! is done with the current one. The turn's fragments are forwarded as they
//! arrive while the conversation keeps its own copy, which it uses to log the
//! turn, feed the other agent, and look for the termination sentinel.
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::errors::MauResult;
use crate::providers::base::FragmentStream;

/// Marker an agent can output to end the conversation, when allowed
pub const TERMINATION_SENTINEL: &str = "<TERMINATE>";

const MARKDOWN_INSTRUCTION: &str = "\n\nYou may use Markdown formatting.";
const TERMINATION_INSTRUCTION: &str =
    "\n\nYou may end the conversation by outputting `<TERMINATE>`.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSettings {
    #[serde(default)]
    pub use_markdown: bool,
    #[serde(default)]
    pub allow_termination: bool,
    #[serde(default)]
    pub initial_message: Option<String>,
}

impl ConversationSettings {
    /// The text appended to both agents' system prompts
    pub fn instructions(&self) -> String {
        let mut instructions = String::new();
        if self.use_markdown {
            instructions.push_str(MARKDOWN_INSTRUCTION);
        }
        if self.allow_termination {
            instructions.push_str(TERMINATION_INSTRUCTION);
        }
        instructions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnLogEntry {
    #[serde(rename = "agent")]
    pub speaker: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Running,
    Ended,
}

/// One agent's turn: who is speaking and the reply as it streams in
pub struct Turn<'a> {
    pub speaker: String,
    pub fragments: FragmentStream<'a>,
}

impl Turn<'_> {
    /// Drain the turn and return the assembled text
    pub async fn into_text(mut self) -> MauResult<String> {
        let mut text = String::new();
        while let Some(fragment) = self.fragments.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

pub struct Conversation {
    agents: [Agent; 2],
    settings: ConversationSettings,
    log: Vec<TurnLogEntry>,
    state: ConversationState,
    started: bool,
    next_speaker: usize,
    last_message: Option<String>,
}

impl Conversation {
    /// Set up a conversation between two agents.
    ///
    /// The markdown and termination instructions implied by `settings` are appended
    /// to both system prompts here, once. Agents should not be reused across
    /// conversations since the instructions would be appended again.
    pub fn new(mut agent1: Agent, mut agent2: Agent, settings: ConversationSettings) -> Self {
        let instructions = settings.instructions();
        if !instructions.is_empty() {
            agent1.append_instruction(&instructions);
            agent2.append_instruction(&instructions);
        }

        Self {
            agents: [agent1, agent2],
            settings,
            log: Vec::new(),
            state: ConversationState::Running,
            started: false,
            next_speaker: 0,
            last_message: None,
        }
    }

    pub fn agent1(&self) -> &Agent {
        &self.agents[0]
    }

    pub fn agent2(&self) -> &Agent {
        &self.agents[1]
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Every completed turn so far, including the initial message
    pub fn log(&self) -> &[TurnLogEntry] {
        &self.log
    }

    /// Start the next turn, or `None` once the conversation has ended.
    ///
    /// The returned turn must be drained to the end for the conversation to go on.
    /// A turn that fails, or is dropped early, ends the conversation.
    pub fn next_turn(&mut self) -> Option<Turn<'_>> {
        if self.state == ConversationState::Ended {
            return None;
        }

        if !self.started {
            self.started = true;
            if let Some(initial_message) = self.settings.initial_message.clone() {
                return Some(self.open_with(initial_message));
            }
        }

        Some(self.take_turn())
    }

    /// Agent 1 "says" the configured opening line; agent 2 answers it next
    fn open_with(&mut self, initial_message: String) -> Turn<'_> {
        let speaker = self.agents[0].name().to_string();
        debug!(%speaker, "opening with the initial message");

        // Restored once the opening line has been read
        self.state = ConversationState::Ended;

        let Conversation {
            agents,
            log,
            state,
            next_speaker,
            last_message,
            ..
        } = self;
        let identity = speaker.clone();

        let fragments: FragmentStream<'_> = Box::pin(async_stream::try_stream! {
            yield initial_message.clone();

            agents[0].record_reply(&initial_message);
            log.push(TurnLogEntry {
                speaker: identity,
                content: initial_message.clone(),
            });
            *last_message = Some(initial_message);
            *next_speaker = 1;
            *state = ConversationState::Running;
        });

        Turn { speaker, fragments }
    }

    fn take_turn(&mut self) -> Turn<'_> {
        let current = self.next_speaker;
        let allow_termination = self.settings.allow_termination;
        let input = self.last_message.take();

        // Only a fully drained turn puts the conversation back to running
        self.state = ConversationState::Ended;

        let Conversation {
            agents,
            log,
            state,
            next_speaker,
            last_message,
            ..
        } = self;
        let agent = &mut agents[current];
        let speaker = agent.name().to_string();
        let identity = speaker.clone();

        let fragments: FragmentStream<'_> = Box::pin(async_stream::try_stream! {
            let mut replies = agent.send(input);
            let mut content = String::new();
            while let Some(fragment) = replies.next().await {
                let fragment = match fragment {
                    Ok(fragment) => fragment,
                    Err(err) => {
                        warn!(speaker = %identity, error = %err, "turn failed, ending conversation");
                        Err(err)?
                    }
                };
                content.push_str(&fragment);
                yield fragment;
            }
            drop(replies);

            let content = content.trim().to_string();
            log.push(TurnLogEntry {
                speaker: identity.clone(),
                content: content.clone(),
            });

            if allow_termination && content.contains(TERMINATION_SENTINEL) {
                info!(speaker = %identity, "termination requested, conversation ended");
            } else {
                *state = ConversationState::Running;
                *next_speaker = 1 - current;
            }
            *last_message = Some(content);
        });

        Turn { speaker, fragments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MauError;
    use crate::models::message::Message;
    use crate::providers::mock::{MockProvider, MockReply};

    fn agent(name: &str, provider: MockProvider) -> Agent {
        Agent::new(
            name,
            "llama3",
            0.8,
            2048,
            format!("You are {}.", name),
            Box::new(provider),
        )
        .unwrap()
    }

    async fn collect_turns(conversation: &mut Conversation, limit: usize) -> MauResult<Vec<(String, String)>> {
        let mut turns = Vec::new();
        while turns.len() < limit {
            let Some(turn) = conversation.next_turn() else {
                break;
            };
            let speaker = turn.speaker.clone();
            let text = turn.into_text().await?;
            turns.push((speaker, text));
        }
        Ok(turns)
    }

    #[test]
    fn test_instructions_applied_once_to_both() {
        let settings = ConversationSettings {
            use_markdown: true,
            allow_termination: true,
            initial_message: None,
        };
        let conversation = Conversation::new(
            agent("Alice", MockProvider::new(vec![])),
            agent("Bob", MockProvider::new(vec![])),
            settings,
        );

        let suffix = "\n\nYou may use Markdown formatting.\n\nYou may end the conversation by outputting `<TERMINATE>`.";
        assert_eq!(conversation.agent1().system_prompt(), format!("You are Alice.{}", suffix));
        assert_eq!(conversation.agent2().system_prompt(), format!("You are Bob.{}", suffix));
    }

    #[test]
    fn test_default_settings_leave_prompts_alone() {
        let conversation = Conversation::new(
            agent("Alice", MockProvider::new(vec![])),
            agent("Bob", MockProvider::new(vec![])),
            ConversationSettings::default(),
        );
        assert_eq!(conversation.agent1().system_prompt(), "You are Alice.");
        assert_eq!(conversation.agent2().system_prompt(), "You are Bob.");
        assert_eq!(conversation.state(), ConversationState::Running);
        assert!(conversation.log().is_empty());
    }

    #[tokio::test]
    async fn test_agents_alternate() -> MauResult<()> {
        let mut conversation = Conversation::new(
            agent("Alice", MockProvider::repeating(MockReply::text("A1"))),
            agent("Bob", MockProvider::repeating(MockReply::text("A2"))),
            ConversationSettings::default(),
        );

        let turns = collect_turns(&mut conversation, 4).await?;
        let speakers: Vec<&str> = turns.iter().map(|(s, _)| s.as_str()).collect();
        let contents: Vec<&str> = turns.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(speakers, vec!["Alice", "Bob", "Alice", "Bob"]);
        assert_eq!(contents, vec!["A1", "A2", "A1", "A2"]);

        assert_eq!(conversation.log().len(), 4);
        assert_eq!(conversation.state(), ConversationState::Running);
        Ok(())
    }

    #[tokio::test]
    async fn test_each_reply_feeds_the_other_agent() -> MauResult<()> {
        let alice = MockProvider::new(vec![MockReply::text("Hello Bob"), MockReply::text("Fine")]);
        let bob = MockProvider::new(vec![MockReply::fragments(&["Hi ", "Alice, how are you? "])]);
        let mut conversation = Conversation::new(
            agent("Alice", alice.clone()),
            agent("Bob", bob.clone()),
            ConversationSettings::default(),
        );

        collect_turns(&mut conversation, 3).await?;

        // Alice opens with only her system prompt
        assert_eq!(alice.requests()[0], vec![Message::system("You are Alice.")]);
        // Bob hears Alice's reply as a user message
        assert_eq!(bob.requests()[0].last(), Some(&Message::user("Hello Bob")));
        // Alice hears Bob's trimmed reply
        assert_eq!(alice.requests()[1].last(), Some(&Message::user("Hi Alice, how are you?")));

        assert_eq!(
            conversation.agent1().messages(),
            vec![
                Message::system("You are Alice."),
                Message::assistant("Hello Bob"),
                Message::user("Hi Alice, how are you?"),
                Message::assistant("Fine"),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_initial_message() -> MauResult<()> {
        let alice = MockProvider::repeating(MockReply::text("unused"));
        let bob = MockProvider::repeating(MockReply::text("Hello yourself"));
        let settings = ConversationSettings {
            initial_message: Some("Hi there".to_string()),
            ..Default::default()
        };
        let mut conversation = Conversation::new(agent("Alice", alice.clone()), agent("Bob", bob.clone()), settings);

        let turns = collect_turns(&mut conversation, 2).await?;
        assert_eq!(turns[0], ("Alice".to_string(), "Hi there".to_string()));
        assert_eq!(turns[1], ("Bob".to_string(), "Hello yourself".to_string()));

        // The opening line never reached Alice's backend
        assert_eq!(alice.calls(), 0);
        assert_eq!(bob.requests()[0].last(), Some(&Message::user("Hi there")));
        assert_eq!(conversation.agent1().messages()[1], Message::assistant("Hi there"));
        assert_eq!(
            conversation.log()[0],
            TurnLogEntry {
                speaker: "Alice".to_string(),
                content: "Hi there".to_string()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_termination() -> MauResult<()> {
        let alice = MockProvider::repeating(MockReply::text("Nice talking to you."));
        let bob = MockProvider::repeating(MockReply::fragments(&["Goodbye ", "<TERMINATE>"]));
        let settings = ConversationSettings {
            allow_termination: true,
            ..Default::default()
        };
        let mut conversation = Conversation::new(agent("Alice", alice.clone()), agent("Bob", bob.clone()), settings);

        let turns = collect_turns(&mut conversation, 10).await?;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].1, "Goodbye <TERMINATE>");
        assert_eq!(conversation.state(), ConversationState::Ended);
        assert!(conversation.next_turn().is_none());
        assert_eq!(alice.calls(), 1);
        assert_eq!(bob.calls(), 1);
        assert_eq!(conversation.log().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_sentinel_ignored_when_termination_disallowed() -> MauResult<()> {
        let mut conversation = Conversation::new(
            agent("Alice", MockProvider::repeating(MockReply::text("<TERMINATE>"))),
            agent("Bob", MockProvider::repeating(MockReply::text("Still here"))),
            ConversationSettings::default(),
        );

        let turns = collect_turns(&mut conversation, 3).await?;
        assert_eq!(turns.len(), 3);
        assert_eq!(conversation.state(), ConversationState::Running);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_failure_ends_conversation() {
        let alice = MockProvider::repeating(MockReply::text("Hello"));
        let bob = MockProvider::new(vec![MockReply::fail_after(&["Hel"], "connection reset")]);
        let mut conversation = Conversation::new(
            agent("Alice", alice.clone()),
            agent("Bob", bob.clone()),
            ConversationSettings::default(),
        );

        let first = conversation.next_turn().unwrap().into_text().await;
        assert_eq!(first.unwrap(), "Hello");

        let mut turn = conversation.next_turn().unwrap();
        assert_eq!(turn.speaker, "Bob");
        assert_eq!(turn.fragments.next().await.unwrap().unwrap(), "Hel");
        let err = turn.fragments.next().await.unwrap().unwrap_err();
        assert_eq!(err, MauError::provider("connection reset"));
        assert!(turn.fragments.next().await.is_none());
        drop(turn);

        assert_eq!(conversation.state(), ConversationState::Ended);
        assert!(conversation.next_turn().is_none());
        assert_eq!(alice.calls(), 1);
        // The failed turn is neither logged nor recorded by Bob
        assert_eq!(conversation.log().len(), 1);
        assert_eq!(conversation.agent2().messages().len(), 1);
    }

    #[tokio::test]
    async fn test_stopping_after_one_turn_issues_no_more_requests() -> MauResult<()> {
        let alice = MockProvider::repeating(MockReply::text("A1"));
        let bob = MockProvider::repeating(MockReply::text("A2"));
        let mut conversation = Conversation::new(
            agent("Alice", alice.clone()),
            agent("Bob", bob.clone()),
            ConversationSettings::default(),
        );

        let turns = collect_turns(&mut conversation, 1).await?;
        assert_eq!(turns.len(), 1);
        drop(conversation);

        assert_eq!(alice.calls(), 1);
        assert_eq!(bob.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_abandoned_turn_ends_conversation() {
        let alice = MockProvider::repeating(MockReply::fragments(&["A", "1"]));
        let bob = MockProvider::repeating(MockReply::text("A2"));
        let mut conversation = Conversation::new(
            agent("Alice", alice.clone()),
            agent("Bob", bob.clone()),
            ConversationSettings::default(),
        );

        let mut turn = conversation.next_turn().unwrap();
        assert_eq!(turn.fragments.next().await.unwrap().unwrap(), "A");
        drop(turn);

        assert_eq!(conversation.state(), ConversationState::Ended);
        assert!(conversation.next_turn().is_none());
        assert!(conversation.log().is_empty());
        assert_eq!(conversation.agent1().messages().len(), 1);
        assert_eq!(bob.calls(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_initial_message_ends_conversation() {
        let alice = MockProvider::repeating(MockReply::text("A1"));
        let bob = MockProvider::repeating(MockReply::text("A2"));
        let settings = ConversationSettings {
            initial_message: Some("Hi there".to_string()),
            ..Default::default()
        };
        let mut conversation = Conversation::new(agent("Alice", alice.clone()), agent("Bob", bob.clone()), settings);

        let turn = conversation.next_turn().unwrap();
        assert_eq!(turn.speaker, "Alice");
        drop(turn);

        assert_eq!(conversation.state(), ConversationState::Ended);
        assert!(conversation.next_turn().is_none());
        assert!(conversation.log().is_empty());
        assert_eq!(conversation.agent1().messages().len(), 1);
        assert_eq!(alice.calls(), 0);
        assert_eq!(bob.calls(), 0);
    }

    #[tokio::test]
    async fn test_unpolled_turn_issues_no_request() {
        let alice = MockProvider::repeating(MockReply::text("A1"));
        let mut conversation = Conversation::new(
            agent("Alice", alice.clone()),
            agent("Bob", MockProvider::new(vec![])),
            ConversationSettings::default(),
        );

        let turn = conversation.next_turn().unwrap();
        assert_eq!(turn.speaker, "Alice");
        drop(turn);

        assert_eq!(alice.calls(), 0);
        assert_eq!(conversation.state(), ConversationState::Ended);
    }

    #[test]
    fn test_log_entry_wire_shape() {
        let entry = TurnLogEntry {
            speaker: "Alice".to_string(),
            content: "Hi".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"agent": "Alice", "content": "Hi"})
        );
    }
}
