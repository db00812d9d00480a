//! Terminal output for chats, uploads, and the dashboard.
//!
//! This module provides a renderer trait and a plain-text implementation with
//! optional ANSI styling.  The `format_*` functions build the text without
//! printing it.

use std::io::{self, Write};

use crate::dashboard::{StatsWidget, Trend};
use crate::types::{Chat, Message, MessageRole, UploadStatus, UploadedFile};
use crate::upload::UploadObserver;
use crate::utils::time::{format_clock, format_date};

/// ANSI escape code for dim text (typing indicator, sources, metadata).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (widget values).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (assistant label, successful uploads).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (errors, falling trends).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for yellow text (uploads in flight).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Trait for rendering assistant output.
///
/// The REPL and the upload tool both render through this trait, so output can
/// be styled, plain, or captured.
pub trait Renderer: UploadObserver + Send {
    /// Print one chat message with its citations.
    fn print_message(&mut self, message: &Message);

    /// Show that a reply is pending.
    fn print_typing(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the list of chats, marking the active one.
    fn print_chat_list(&mut self, chats: &[Chat], active_id: Option<&str>);

    /// Print one uploader entry.
    fn print_upload(&mut self, file: &UploadedFile);

    /// Print a row of dashboard widgets.
    fn print_widgets(&mut self, widgets: &[StatsWidget]);

    /// Print every message of a chat.
    fn print_chat(&mut self, chat: &Chat) {
        for message in &chat.messages {
            self.print_message(message);
        }
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// Regular output goes to the configured writer (stdout by default); errors
/// always go to stderr.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), use_color)
    }

    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: Box<dyn Write + Send>, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Whether ANSI styling is enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        let text = format_message(message, self.use_color);
        self.emit(&text);
    }

    fn print_typing(&mut self) {
        let text = style("Assistant is typing...", ANSI_DIM, self.use_color);
        self.emit(&format!("{text}\n"));
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("Error: {error}");
    }

    fn print_info(&mut self, info: &str) {
        self.emit(&format!("{info}\n"));
    }

    fn print_chat_list(&mut self, chats: &[Chat], active_id: Option<&str>) {
        let text = format_chat_list(chats, active_id);
        self.emit(&text);
    }

    fn print_upload(&mut self, file: &UploadedFile) {
        let line = format_upload(file, self.use_color);
        self.emit(&format!("{line}\n"));
    }

    fn print_widgets(&mut self, widgets: &[StatsWidget]) {
        for widget in widgets {
            let text = format_widget(widget, self.use_color);
            self.emit(&text);
        }
    }
}

impl UploadObserver for PlainTextRenderer {
    fn progress(&mut self, file: &UploadedFile) {
        // Tenths are enough for a terminal; 100% is reported on completion.
        if file.progress % 10 == 0 && file.progress < 100 {
            self.print_upload(file);
        }
    }

    fn file_finished(&mut self, file: &UploadedFile) {
        self.print_upload(file);
    }

    fn batch_complete(&mut self, succeeded: &[UploadedFile]) {
        let noun = if succeeded.len() == 1 { "file" } else { "files" };
        self.print_info(&format!("Uploaded {} {noun}.", succeeded.len()));
    }
}

fn style(text: &str, code: &str, use_color: bool) -> String {
    if use_color {
        format!("{code}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

/// Render a message: label and time, content, then numbered sources.
pub fn format_message(message: &Message, use_color: bool) -> String {
    let color = match message.role {
        MessageRole::User => ANSI_CYAN,
        MessageRole::Assistant => ANSI_GREEN,
    };
    let label = style(message.role.label(), color, use_color);
    let time = style(&format_clock(message.timestamp), ANSI_DIM, use_color);
    let mut out = format!("{label} {time}\n{}\n", message.content);
    let citations = message.citations();
    if !citations.is_empty() {
        out.push_str(&style("Sources:", ANSI_DIM, use_color));
        out.push('\n');
        for (idx, citation) in citations.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {} ({})\n",
                idx + 1,
                citation.source,
                citation.chunk
            ));
        }
    }
    out.push('\n');
    out
}

/// Render the chat list, one numbered line per chat, newest first.
pub fn format_chat_list(chats: &[Chat], active_id: Option<&str>) -> String {
    if chats.is_empty() {
        return "No chats yet. Use /new to start one.\n".to_string();
    }
    let mut out = String::from("Recent Chats\n");
    for (idx, chat) in chats.iter().enumerate() {
        let marker = if Some(chat.id.as_str()) == active_id {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!(
            "{marker} {}. {} ({})\n",
            idx + 1,
            chat.title,
            format_date(chat.timestamp)
        ));
    }
    out
}

/// Render one uploader entry on a single line.
pub fn format_upload(file: &UploadedFile, use_color: bool) -> String {
    let (icon, color) = match file.status {
        UploadStatus::Uploading => ("[..]", ANSI_YELLOW),
        UploadStatus::Success => ("[ok]", ANSI_GREEN),
        UploadStatus::Error => ("[x]", ANSI_RED),
    };
    let mut line = format!(
        "{} {} ({})",
        style(icon, color, use_color),
        file.name,
        file.display_size()
    );
    match file.status {
        UploadStatus::Uploading => line.push_str(&format!(" {}%", file.progress)),
        UploadStatus::Success => line.push_str(" uploaded"),
        UploadStatus::Error => {
            let reason = file.error.as_deref().unwrap_or("upload failed");
            line.push_str(&format!(" {}", style(reason, ANSI_RED, use_color)));
        }
    }
    line
}

/// Render a dashboard widget as a small block.
pub fn format_widget(widget: &StatsWidget, use_color: bool) -> String {
    let mut out = format!(
        "{}\n  {}\n",
        widget.title.to_uppercase(),
        style(&widget.value, ANSI_BOLD, use_color)
    );
    if let Some(change) = &widget.change {
        let (arrow, color) = match widget.trend {
            Trend::Up => ("↑", ANSI_GREEN),
            Trend::Down => ("↓", ANSI_RED),
        };
        out.push_str(&format!(
            "  {}\n",
            style(&format!("{arrow} {change}"), color, use_color)
        ));
    }
    out
}
