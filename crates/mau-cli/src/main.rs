use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use mau::transcript::Transcript;

mod configuration;
mod error;
mod inputs;
mod session;

use configuration::Settings;
use session::{Session, SessionOutcome};

#[derive(Parser)]
#[command(author, version, about = "Run a conversation between two language-model agents", long_about = None)]
struct Cli {
    /// Configuration file (JSON or TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Write the transcript as JSON to this file when the conversation ends
    #[arg(long)]
    save_json: Option<PathBuf>,

    /// Write the transcript as plain text to this file when the conversation ends
    #[arg(long)]
    save_text: Option<PathBuf>,

    /// Stop after this many turns, counting the initial message
    #[arg(long)]
    max_turns: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let conversation = settings.conversation.into_conversation()?;

    let mut session = Session::new(conversation, cli.max_turns, std::io::stdout());
    let outcome = session.run().await?;

    let transcript = Transcript::from(session.conversation());
    save(&cli, &transcript)?;

    if let SessionOutcome::Failed(e) = outcome {
        return Err(e.into());
    }
    Ok(())
}

fn save(cli: &Cli, transcript: &Transcript) -> Result<()> {
    if cli.save_json.is_none() && cli.save_text.is_none() {
        if !std::io::stdin().is_terminal() {
            return Ok(());
        }
        if let Some(path) = inputs::ask_json_save_path()? {
            transcript.save_json(&path)?;
            println!("Conversation saved to {} in JSON format.", style(path.display()).green());
        }
        return Ok(());
    }

    if let Some(path) = &cli.save_json {
        transcript.save_json(path)?;
        println!("Conversation saved to {} in JSON format.", style(path.display()).green());
    }
    if let Some(path) = &cli.save_text {
        transcript.save_text(path)?;
        println!("Conversation saved to {} as text.", style(path.display()).green());
    }
    Ok(())
}
