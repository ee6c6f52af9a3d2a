//! Reverie CLI - chat with a persona that remembers you
//!
//! Usage:
//!   reverie chat                 Interactive conversation
//!   reverie say "message"        One turn, print the reply
//!   reverie info --top 5         Memory summary
//!   reverie context              Context window size
//!   reverie reset                Wipe memory and context

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use reverie::{
    DocumentBackend, JsonFileBackend, LexiconAnalyzer, MemoryStore, ModelConfig,
    OpenAiCompatibleClient, Session, SessionConfig, SqliteBackend, TurnOutcome,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "reverie")]
#[command(about = "Reverie - a chat persona with long-term memory")]
#[command(version)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, default_value = "./reverie_data")]
    data_dir: PathBuf,

    /// Storage backend
    #[arg(short, long, value_enum, default_value = "json")]
    backend: BackendKind,

    /// Session settings (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Chat-completions endpoint
    #[arg(long, env = "API_URL", default_value = "http://localhost:1234/v1/chat/completions")]
    api_url: String,

    /// Model name sent with every request
    #[arg(long, env = "MODEL", default_value = "lmstudio-community/phi-3-mini-4k")]
    model: String,

    #[arg(long, env = "TEMPERATURE", default_value = "0.7")]
    temperature: f32,

    #[arg(long, env = "MAX_TOKENS", default_value = "512")]
    max_tokens: u32,

    /// Request timeout in seconds (none by default)
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation
    Chat,

    /// Send a single message and print the reply
    Say {
        /// Message text
        message: String,
    },

    /// Show what has been remembered
    Info {
        /// Entries per like/dislike list
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Wipe memory and context
    Reset,

    /// Show the context window size
    Context,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Json,
    Sqlite,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut session = open_session(&cli).await?;

    match cli.command {
        Commands::Chat => cmd_chat(&mut session).await,
        Commands::Say { message } => cmd_say(&mut session, &message).await,
        Commands::Info { top } => {
            print_info(&session, top);
            Ok(())
        }
        Commands::Reset => cmd_reset(&mut session).await,
        Commands::Context => {
            print_context(&session);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("warn,reverie=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,reverie=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_session(cli: &Cli) -> anyhow::Result<Session> {
    let config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };

    let backend = open_backend(cli.backend, &cli.data_dir).await?;
    let store = MemoryStore::open(backend).await?;

    let model = OpenAiCompatibleClient::new(ModelConfig {
        api_url: cli.api_url.clone(),
        model: cli.model.clone(),
        temperature: cli.temperature,
        max_tokens: cli.max_tokens,
        timeout_secs: cli.timeout,
    })?;

    Ok(Session::new(
        config,
        store,
        Arc::new(LexiconAnalyzer::default()),
        Arc::new(model),
    )?)
}

async fn open_backend(kind: BackendKind, data_dir: &Path) -> anyhow::Result<Arc<dyn DocumentBackend>> {
    let backend: Arc<dyn DocumentBackend> = match kind {
        BackendKind::Json => Arc::new(JsonFileBackend::new(data_dir)),
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(data_dir.join("reverie.db")).await?),
    };
    Ok(backend)
}

async fn cmd_chat(session: &mut Session) -> anyhow::Result<()> {
    println!("{}", "Reverie".bold().underline());
    println!(
        "{}",
        "Type 'exit' to leave, 'info' for memories, 'context' for the window, 'reset' to forget."
            .dimmed()
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n{} ", "You:".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match repl_command(input) {
            Some(ReplCommand::Exit) => break,
            Some(ReplCommand::Reset) => cmd_reset(session).await?,
            Some(ReplCommand::Info) => print_info(session, 5),
            Some(ReplCommand::Context) => print_context(session),
            None => print_outcome(session.turn(input).await?),
        }
    }

    println!("{}", "Goodbye.".dimmed());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    Reset,
    Info,
    Context,
}

/// Words the REPL handles itself, bare or behind a single `!`
fn repl_command(input: &str) -> Option<ReplCommand> {
    let word = input.strip_prefix('!').unwrap_or(input).to_lowercase();
    match word.as_str() {
        "exit" | "quit" => Some(ReplCommand::Exit),
        "reset" => Some(ReplCommand::Reset),
        "info" => Some(ReplCommand::Info),
        "context" => Some(ReplCommand::Context),
        _ => None,
    }
}

async fn cmd_say(session: &mut Session, message: &str) -> anyhow::Result<()> {
    let outcome = session.turn(message).await?;
    let failed = outcome == TurnOutcome::NoReply;
    print_outcome(outcome);
    if failed {
        anyhow::bail!("no reply from the model");
    }
    Ok(())
}

async fn cmd_reset(session: &mut Session) -> anyhow::Result<()> {
    session.reset_all().await?;
    println!("{}", "Memory and context wiped".green().bold());
    Ok(())
}

fn print_outcome(outcome: TurnOutcome) {
    match outcome {
        TurnOutcome::Replied(reply) => {
            println!("{} {}", "Reverie:".magenta().bold(), reply);
        }
        TurnOutcome::NoReply => {
            println!(
                "{}",
                "No reply from the model. Your message was kept; try again.".yellow()
            );
        }
    }
}

fn print_info(session: &Session, top: usize) {
    let summary = session.memory_summary(top);

    println!("{}", "Memory Summary".bold().underline());
    println!("  Entries:  {}", summary.total_entries);
    println!("  Entities: {}", summary.total_entities);
    println!("  Themes:   {}", summary.total_themes);
    match summary.last_updated {
        Some(at) => println!("  Updated:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Updated:  {}", "never".dimmed()),
    }
    println!(
        "  Context:  {}",
        if summary.has_context { "active" } else { "empty" }
    );

    if !summary.likes.is_empty() {
        println!("\n{}", "Likes:".bold().green());
        for entity in &summary.likes {
            println!(
                "  {:<30} {:+.2}  ({}x)",
                entity.key, entity.score, entity.frequency
            );
        }
    }

    if !summary.dislikes.is_empty() {
        println!("\n{}", "Dislikes:".bold().red());
        for entity in &summary.dislikes {
            println!(
                "  {:<30} {:+.2}  ({}x)",
                entity.key, entity.score, entity.frequency
            );
        }
    }

    if !summary.theme_summary.is_empty() {
        println!("\n  {}", summary.theme_summary);
    }
    if !summary.emotional_arc.is_empty() {
        println!("  {}", summary.emotional_arc);
    }
}

fn print_context(session: &Session) {
    println!(
        "Context: {} messages (max {})",
        session.context().len(),
        session.config().max_context_messages
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repl_accepts_bare_or_single_marker_commands() {
        assert_eq!(repl_command("exit"), Some(ReplCommand::Exit));
        assert_eq!(repl_command("!quit"), Some(ReplCommand::Exit));
        assert_eq!(repl_command("!INFO"), Some(ReplCommand::Info));
        assert_eq!(repl_command("context"), Some(ReplCommand::Context));
        assert_eq!(repl_command("!reset"), Some(ReplCommand::Reset));
    }

    #[test]
    fn repeated_markers_are_not_repl_commands() {
        assert_eq!(repl_command("!!!exit"), None);
        assert_eq!(repl_command("!!info"), None);
        assert_eq!(repl_command("!help"), None);
        assert_eq!(repl_command("exit now"), None);
    }
}
