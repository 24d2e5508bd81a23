use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::agent::Agent;
use crate::conversation::{Conversation, TurnLogEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub model: String,
    pub system_prompt: String,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            name: agent.name().to_string(),
            model: agent.model().to_string(),
            system_prompt: agent.system_prompt(),
        }
    }
}

/// A finished (or interrupted) conversation, ready to be written out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub agent1: AgentSummary,
    pub agent2: AgentSummary,
    pub conversation: Vec<TurnLogEntry>,
}

impl From<&Conversation> for Transcript {
    fn from(conversation: &Conversation) -> Self {
        Self {
            agent1: conversation.agent1().into(),
            agent2: conversation.agent2().into(),
            conversation: conversation.log().to_vec(),
        }
    }
}

impl Transcript {
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for (index, agent) in [&self.agent1, &self.agent2].into_iter().enumerate() {
            // Writing to a String cannot fail
            let _ = write!(
                text,
                "=== Agent {}: {} ===\nModel: {}\nSystem Prompt: {}\n\n",
                index + 1,
                agent.name,
                agent.model,
                agent.system_prompt
            );
        }
        text.push_str("=== Conversation Log ===\n");
        for entry in &self.conversation {
            let _ = writeln!(text, "{}: {}", entry.speaker, entry.content);
        }
        text
    }

    pub fn save_text(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_text())
            .with_context(|| format!("Failed to write transcript to {}", path.display()))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
