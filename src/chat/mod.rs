//! Chat application module for conversations with the RAG assistant.
//!
//! This module provides the session that drives the `shapeshifter-chat` REPL.
//! It supports:
//!
//! - Several chats per session, each with its own history
//! - Document uploads with per-file progress and errors
//! - Slash commands for chats, uploads, and settings
//! - Configuration from flags, a YAML file, and the environment
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and backend interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, SUGGESTED_PROMPTS, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ConfigFile, DEFAULT_SESSION_ID};
pub use session::{ChatSession, SEND_FAILURE_REPLY, SessionStats};
