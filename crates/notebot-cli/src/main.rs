//! NoteBot CLI: drive a document chat session from the terminal.

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::Flow;
use notebot_config::{CliOverrides, NotebotConfig, StorageBackendKind};
use notebot_session::SessionManager;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "notebot", version, about = "Chat history for a document Q&A session")]
struct Cli {
    /// Where to keep the session snapshot: memory or file
    #[arg(long, value_parser = parse_backend)]
    storage: Option<StorageBackendKind>,

    /// Snapshot file for the file backend
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Exchanges included by /context when no count is given
    #[arg(long)]
    context_exchanges: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

fn parse_backend(s: &str) -> Result<StorageBackendKind, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = NotebotConfig::load(CliOverrides {
        backend: cli.storage,
        snapshot_path: cli.snapshot,
        context_exchanges: cli.context_exchanges,
    })
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::debug!(
        "Config dir {}, {:?} storage at {}, max {} messages",
        config.config_dir.display(),
        config.backend,
        config.snapshot_path.display(),
        config.max_messages
    );

    let mut session = SessionManager::new(
        config.snapshot_backend(),
        config.limits,
        config.max_messages,
    );

    repl(&mut session, &config)
}

fn repl(session: &mut SessionManager, config: &NotebotConfig) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    let restored = session.chat().get_message_count();
    eprintln!(
        "notebot v{} (session: {}, storage: {:?})",
        env!("CARGO_PKG_VERSION"),
        session.get_session_id(),
        config.backend
    );
    if restored > 0 {
        eprintln!("Restored {restored} messages.");
    }
    if !session.is_storage_active() {
        eprintln!(
            "Warning: storage is {}; continuing without saved history.",
            session.get_session_status().storage_status
        );
    }
    eprintln!("Type a question, or /help for commands. Press Ctrl+D to exit.\n");

    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let mut input = String::new();
        let bytes_read = stdin.lock().read_line(&mut input)?;
        if bytes_read == 0 {
            eprintln!();
            break;
        }

        if input.trim().is_empty() {
            continue;
        }

        let command = commands::parse(&input);
        let mut out = stdout.lock();
        if commands::execute(command, session, config.context_exchanges, &mut out)? == Flow::Break
        {
            break;
        }
        out.flush()?;
    }

    Ok(())
}
