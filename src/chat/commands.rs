//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to manage chats, uploads, and settings without sending
//! a message to the assistant.

/// Prompts offered to a user who does not know what to ask.
pub const SUGGESTED_PROMPTS: &[&str] = &[
    "What documents are available?",
    "Explain the main concepts",
    "Summarize the key findings",
];

/// A parsed chat command.
///
/// These commands control the session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new chat and make it active.
    NewChat,

    /// List all chats.
    ListChats,

    /// Switch to a chat by 1-based list position or id.
    Switch(String),

    /// Re-render the active chat.
    History,

    /// Upload one or more files.
    Upload(Vec<String>),

    /// Import a file from Google Drive by id.
    Drive(String),

    /// List the uploader's entries.
    Files,

    /// Remove one uploader entry.
    Dismiss(String),

    /// Remove every finished uploader entry.
    DismissAll,

    /// Show current settings and the available choices.
    Settings,

    /// Change the language model.
    Llm(String),

    /// Change the vector database.
    VectorDb(String),

    /// Check the backend's health.
    Health,

    /// Show the dashboard widgets.
    Dashboard,

    /// Show suggested prompts.
    Suggest,

    /// Save every chat to a file.
    SaveTranscript(String),

    /// Replace every chat with the contents of a file.
    LoadTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use shapeshifter::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/llm gpt-4").is_some());
/// assert!(parse_command("What documents are available?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::NewChat,
        "chats" | "list" => ChatCommand::ListChats,
        "switch" => required(argument, ChatCommand::Switch, "/switch requires a chat number or id"),
        "history" => ChatCommand::History,
        "upload" => match argument {
            Some(arg) => ChatCommand::Upload(arg.split_whitespace().map(str::to_string).collect()),
            None => ChatCommand::Invalid("/upload requires at least one file path".to_string()),
        },
        "drive" => required(argument, ChatCommand::Drive, "/drive requires a Google Drive file id"),
        "files" => ChatCommand::Files,
        "dismiss" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("all") => ChatCommand::DismissAll,
            Some(arg) => ChatCommand::Dismiss(arg.to_string()),
            None => ChatCommand::Invalid("/dismiss requires a file id or 'all'".to_string()),
        },
        "settings" => ChatCommand::Settings,
        "llm" | "model" => required(argument, ChatCommand::Llm, "/llm requires a model id"),
        "vectordb" | "vector_db" => {
            required(argument, ChatCommand::VectorDb, "/vectordb requires a database id")
        }
        "health" => ChatCommand::Health,
        "dashboard" => ChatCommand::Dashboard,
        "suggest" => ChatCommand::Suggest,
        "save" => required(argument, ChatCommand::SaveTranscript, "/save requires a file path"),
        "load" => required(argument, ChatCommand::LoadTranscript, "/load requires a file path"),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn required<F>(argument: Option<&str>, constructor: F, missing: &str) -> ChatCommand
where
    F: Fn(String) -> ChatCommand,
{
    match argument {
        Some(arg) => constructor(arg.to_string()),
        None => ChatCommand::Invalid(missing.to_string()),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /chats                 List chats (* marks the active one)
  /switch <n|id>         Switch to a chat by number or id
  /history               Show the active chat again
  /upload <file>...      Upload documents (.pdf, .txt, .docx, .doc)
  /drive <file_id>       Import a document from Google Drive
  /files                 List uploaded files
  /dismiss <id|all>      Remove an uploaded file entry (or all finished)
  /settings              Show model and vector database settings
  /llm <id>              Change the language model
  /vectordb <id>         Change the vector database
  /health                Check the backend
  /dashboard             Show session dashboard
  /suggest               Show suggested prompts
  /save <file>           Save all chats to a file
  /load <file>           Load chats from a file
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
