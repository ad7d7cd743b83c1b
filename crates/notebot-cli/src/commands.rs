//! REPL command parsing and dispatch against a live session.

use notebot_session::{SaveOutcome, SessionManager};
use std::io::{self, Write};

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    /// Plain text: a user message.
    Ask(&'a str),
    /// `/reply <text>`: an assistant message.
    Reply(&'a str),
    /// `/upload <name> [size]`
    Upload { name: &'a str, size: Option<u64> },
    Ready,
    History,
    Context(Option<usize>),
    Status,
    Privacy,
    Clear,
    Help,
    Quit,
    /// A known command with missing or bad arguments.
    Usage(&'static str),
    Unknown(&'a str),
}

/// Whether the REPL keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

pub fn parse(input: &str) -> Command<'_> {
    let input = input.trim();
    if !input.starts_with('/') {
        return Command::Ask(input);
    }

    let (cmd, args) = match input.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (input, ""),
    };

    match cmd {
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        "/ready" => Command::Ready,
        "/history" => Command::History,
        "/status" => Command::Status,
        "/privacy" => Command::Privacy,
        "/clear" => Command::Clear,
        "/reply" if !args.is_empty() => Command::Reply(args),
        "/reply" => Command::Usage("/reply <text>"),
        "/upload" if !args.is_empty() => parse_upload(args),
        "/upload" => Command::Usage("/upload <name> [size-bytes]"),
        "/context" if args.is_empty() => Command::Context(None),
        "/context" => match args.parse() {
            Ok(n) => Command::Context(Some(n)),
            Err(_) => Command::Usage("/context [exchanges]"),
        },
        _ => Command::Unknown(cmd),
    }
}

/// A trailing number is the size; everything before it is the name.
fn parse_upload(args: &str) -> Command<'_> {
    if let Some((name, size)) = args.rsplit_once(char::is_whitespace) {
        if let Ok(size) = size.parse::<u64>() {
            return Command::Upload {
                name: name.trim(),
                size: Some(size),
            };
        }
    }
    Command::Upload {
        name: args,
        size: None,
    }
}

/// Run one command, writing user-facing output to `out`.
pub fn execute(
    command: Command<'_>,
    session: &mut SessionManager,
    default_exchanges: usize,
    out: &mut impl Write,
) -> io::Result<Flow> {
    match command {
        Command::Ask(text) => add_message(session, "user", text, out)?,
        Command::Reply(text) => add_message(session, "assistant", text, out)?,
        Command::Upload { name, size } => {
            // Re-uploading the loaded document must not wipe the conversation
            if session.get_document_name() == Some(name) {
                writeln!(out, "'{name}' is already loaded.")?;
            } else {
                session.handle_new_document_upload(name, size);
                writeln!(out, "Loaded '{name}'. Chat history cleared.")?;
            }
        }
        Command::Ready => {
            session.mark_vector_store_ready();
            writeln!(out, "Vector store ready.")?;
        }
        Command::History => {
            let history = session.get_chat_history();
            if history.is_empty() {
                writeln!(out, "No messages yet.")?;
            }
            for message in &history {
                writeln!(
                    out,
                    "[{}] {}: {}",
                    message.timestamp().format("%H:%M:%S"),
                    message.role(),
                    message.content()
                )?;
            }
        }
        Command::Context(n) => {
            let ctx = session.get_conversation_context(n.unwrap_or(default_exchanges));
            writeln!(out, "{}", serde_json::to_string_pretty(&ctx)?)?;
        }
        Command::Status => {
            let status = session.get_session_status();
            writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
        }
        Command::Privacy => {
            let privacy = session.get_privacy_status();
            writeln!(out, "{}", serde_json::to_string_pretty(&privacy)?)?;
        }
        Command::Clear => {
            session.chat_mut().clear_history();
            writeln!(out, "Chat history cleared.")?;
        }
        Command::Help => print_help(out)?,
        Command::Quit => return Ok(Flow::Break),
        Command::Usage(usage) => writeln!(out, "Usage: {usage}")?,
        Command::Unknown(cmd) => {
            writeln!(out, "Unknown command: {cmd}. Type /help for available commands.")?
        }
    }
    Ok(Flow::Continue)
}

fn add_message(
    session: &mut SessionManager,
    role: &str,
    text: &str,
    out: &mut impl Write,
) -> io::Result<()> {
    match session.add_message(role, text, None) {
        Ok(outcome) => report_save(outcome, out),
        Err(e) => writeln!(out, "Message not added: {e}"),
    }
}

/// Storage trouble is surfaced, but never stops the conversation.
fn report_save(outcome: SaveOutcome, out: &mut impl Write) -> io::Result<()> {
    match outcome {
        SaveOutcome::Saved { .. } => Ok(()),
        SaveOutcome::SavedOversized { size_kb } => writeln!(
            out,
            "Warning: chat history is large ({size_kb:.1}KB). Consider /clear."
        ),
        SaveOutcome::Rejected { size_kb } => writeln!(
            out,
            "Warning: chat history ({size_kb:.1}KB) is too large to save. Use /clear to free space."
        ),
        SaveOutcome::Failed => writeln!(out, "Warning: could not save chat history."),
    }
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Type a question to add it as a user message.")?;
    writeln!(out, "Available commands:")?;
    writeln!(out, "  /reply <text>          Add an assistant message")?;
    writeln!(out, "  /upload <name> [size]  Load a new document (clears history)")?;
    writeln!(out, "  /ready                 Mark the vector store as ready")?;
    writeln!(out, "  /history               Show the chat history")?;
    writeln!(out, "  /context [n]           Show the context for the last n exchanges")?;
    writeln!(out, "  /status                Show session status")?;
    writeln!(out, "  /privacy               Show where data is kept")?;
    writeln!(out, "  /clear                 Clear the chat history")?;
    writeln!(out, "  /quit                  Exit")?;
    Ok(())
}
