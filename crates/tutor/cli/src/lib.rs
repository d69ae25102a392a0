//! Tutor CLI - terminal chat front-end for the language-tutor assistant.
//!
//! Each submitted line becomes one turn: the reply and the feedback
//! annotation are fetched concurrently, and the transcript is re-rendered
//! once the turn settles. Blank lines are ignored without starting a turn.

use std::ffi::OsString;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_engine::TurnEngine;
use tutor_model_openai::OpenAiClient;
use tutor_transcript::Transcript;

mod error;
mod output;

pub use error::{CliError, CliResult};

/// Tutor CLI application
#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "Chat with an English tutor that corrects your sentences as you go", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let client = OpenAiClient::from_env().map_err(|err| CliError::Configuration(err.to_string()))?;
    let transcript = Arc::new(Transcript::new());
    let engine = TurnEngine::new(Arc::clone(&transcript), Arc::new(client));

    println!("Type a message to chat; your English gets feedback alongside the reply.");
    println!("Submit an empty line to skip, /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        // Blank input never reaches the transcript; the engine refuses it.
        let Some(handles) = engine.start_turn(&line) else {
            continue;
        };
        handles.settled().await;
        output::render_transcript(&transcript.snapshot()?);
    }

    Ok(())
}
