//! Interactive chat application for the RAG assistant.
//!
//! This binary provides a REPL for asking questions about uploaded documents
//! and for managing chats, uploads, and settings.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! shapeshifter-chat
//!
//! # Talk to a specific backend
//! shapeshifter-chat --api-url http://rag.internal:8001
//!
//! # Pick a model and vector database
//! shapeshifter-chat --llm llama-3-70b --vector-db pgvector
//!
//! # Disable colors (useful for piping output)
//! shapeshifter-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new chat
//! - `/upload <file>...` - Upload documents
//! - `/settings` - Show model and vector database
//! - `/dashboard` - Show session dashboard
//! - `/quit` - Exit the application

use std::path::PathBuf;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use shapeshifter::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer,
    SUGGESTED_PROMPTS, help_text, parse_command,
};
use shapeshifter::{
    AVAILABLE_LLMS, AVAILABLE_VECTOR_DBS, CatalogEntry, RagBackend, RagClient, SessionStore,
};

/// Main entry point for the shapeshifter-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("shapeshifter-chat [OPTIONS]");
    let config = ChatConfig::resolve(args)?;
    let use_color = config.use_color;

    let client = RagClient::with_options(Some(config.api_url.clone()), Some(config.timeout))?;
    println!("ShapeShifter RAG Assistant ({})", client.base_url());
    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!(
        "Model: {} | Vector DB: {}",
        session.settings().llm_name(),
        session.settings().vector_db_name()
    );
    println!("Type /help for commands, /quit to exit\n");
    if let Some(chat) = session.active_chat() {
        renderer.print_chat(chat);
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    if cmd == ChatCommand::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    run_command(&mut session, &mut renderer, cmd).await;
                    continue;
                }

                // Regular message - send to the assistant
                if let Err(e) = session.send_message(line, &mut renderer).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn run_command<B: RagBackend>(
    session: &mut ChatSession<B>,
    renderer: &mut PlainTextRenderer,
    cmd: ChatCommand,
) {
    match cmd {
        ChatCommand::Quit => {}
        ChatCommand::NewChat => {
            let chat = session.new_chat();
            renderer.print_chat(chat);
        }
        ChatCommand::ListChats => {
            renderer.print_chat_list(session.chats(), session.store().active_id());
        }
        ChatCommand::Switch(target) => match session.switch_chat(&target) {
            Ok(chat) => {
                renderer.print_info(&format!("Switched to: {}", chat.title));
                renderer.print_chat(chat);
            }
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::History => {
            if let Some(chat) = session.active_chat() {
                renderer.print_chat(chat);
            }
        }
        ChatCommand::Upload(paths) => {
            let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
            renderer.print_info(&session.config().upload_policy.describe());
            if let Err(err) = session.upload_files(&paths, renderer).await {
                renderer.print_error(&err.to_string());
            }
        }
        ChatCommand::Drive(file_id) => match session.import_from_drive(&file_id).await {
            Ok(response) => renderer.print_info(&format!(
                "{}: {} ({})",
                response.filename, response.message, response.status
            )),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Files => {
            let files = session.uploads().files();
            if files.is_empty() {
                renderer.print_info("No uploaded files.");
            }
            for file in files {
                renderer.print_upload(file);
                renderer.print_info(&format!("    id: {}", file.id));
            }
        }
        ChatCommand::Dismiss(id) => match session.dismiss_upload(&id) {
            Ok(file) => renderer.print_info(&format!("Dismissed {}", file.name)),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::DismissAll => {
            let removed = session.clear_finished_uploads();
            renderer.print_info(&format!("Dismissed {removed} finished file(s)."));
        }
        ChatCommand::Settings => print_settings(session),
        ChatCommand::Llm(id) => match session.set_llm(&id) {
            Ok(()) => renderer.print_info(&format!(
                "Model changed to: {}",
                session.settings().llm_name()
            )),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::VectorDb(id) => match session.set_vector_db(&id) {
            Ok(()) => renderer.print_info(&format!(
                "Vector database changed to: {}",
                session.settings().vector_db_name()
            )),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Health => match session.health().await {
            Ok(health) if health.is_healthy() => {
                renderer.print_info(&format!("Backend is healthy ({})", health.status))
            }
            Ok(health) => renderer.print_error(&format!("Backend reports: {}", health.status)),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Dashboard => {
            renderer.print_widgets(&session.dashboard().widgets());
        }
        ChatCommand::Suggest => {
            renderer.print_info("Try asking:");
            for prompt in SUGGESTED_PROMPTS {
                renderer.print_info(&format!("  {prompt}"));
            }
        }
        ChatCommand::SaveTranscript(path) => match session.save_transcript(&path) {
            Ok(_) => renderer.print_info(&format!("Chats saved to {}", path)),
            Err(err) => renderer.print_error(&format!("Failed to save chats: {}", err)),
        },
        ChatCommand::LoadTranscript(path) => match session.load_transcript(&path) {
            Ok(_) => renderer.print_info(&format!("Chats loaded from {}", path)),
            Err(err) => renderer.print_error(&format!("Failed to load chats: {}", err)),
        },
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Stats => print_stats(session),
        ChatCommand::ShowConfig => print_config(session),
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
        }
    }
}

fn print_settings<B: RagBackend>(session: &ChatSession<B>) {
    let settings = session.settings();
    println!("    Settings:");
    print_catalog("Language model", AVAILABLE_LLMS, &settings.llm);
    print_catalog("Vector database", AVAILABLE_VECTOR_DBS, &settings.vector_db);
}

fn print_catalog(label: &str, catalog: &[CatalogEntry], selected: &str) {
    println!("      {label}:");
    for entry in catalog {
        let marker = if entry.id == selected { '*' } else { ' ' };
        println!("      {marker} {:<14} {}", entry.id, entry.name);
    }
}

fn print_stats<B: RagBackend>(session: &ChatSession<B>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Chats: {}", stats.chats);
    println!(
        "      Messages: {} ({} from you, {} from the assistant)",
        stats.messages, stats.user_messages, stats.assistant_messages
    );
    println!(
        "      Requests: {} ({} failed)",
        stats.requests, stats.failed_requests
    );
    println!(
        "      Documents: {} uploaded, {} failed",
        stats.documents_uploaded, stats.upload_failures
    );
}

fn print_config<B: RagBackend>(session: &ChatSession<B>) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Backend: {}", config.api_url);
    println!("      Session id: {}", config.session_id);
    println!("      Model: {}", config.settings.llm_name());
    println!("      Vector database: {}", config.settings.vector_db_name());
    println!("      Uploads: {}", config.upload_policy.describe());
    println!("      Timeout: {}s", config.timeout.as_secs());
    println!(
        "      Colors: {}",
        if config.use_color { "on" } else { "off" }
    );
}
