//! Session storage.
//!
//! A [`SessionStore`] holds every chat plus the id of the active one.  Chats
//! are kept newest-first; messages inside a chat are append-only.  The store
//! is owned by the [`ChatSession`](crate::chat::ChatSession) that drives it,
//! so its lifetime is the lifetime of that session.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};
use crate::observability::CHAT_CREATED;
use crate::types::{Chat, Message};

/// Storage for chats and the active-chat pointer.
///
/// Implementors supply raw access; the provided methods implement the chat
/// operations on top of it and are what the rest of the crate calls.
pub trait SessionStore: Send {
    /// All chats, newest first.
    fn chats(&self) -> &[Chat];

    /// Mutable access to the chat list, for the provided methods below.
    fn chats_mut(&mut self) -> &mut Vec<Chat>;

    /// Id of the active chat, if any.
    fn active_id(&self) -> Option<&str>;

    /// Replace the active-chat pointer.
    fn set_active_id(&mut self, id: Option<String>);

    /// Create a chat, put it at the front of the list, and make it active.
    fn create_chat(&mut self) -> &Chat {
        let chat = Chat::new();
        CHAT_CREATED.click();
        tracing::debug!(chat_id = %chat.id, "created chat");
        self.set_active_id(Some(chat.id.clone()));
        self.chats_mut().insert(0, chat);
        &self.chats()[0]
    }

    /// Make an existing chat active.
    fn select_chat(&mut self, id: &str) -> Result<()> {
        if self.chat(id).is_none() {
            return Err(Error::not_found("no such chat", Some(id.to_string())));
        }
        self.set_active_id(Some(id.to_string()));
        Ok(())
    }

    /// Look up a chat by id.
    fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats().iter().find(|chat| chat.id == id)
    }

    /// The active chat, if any.
    fn active_chat(&self) -> Option<&Chat> {
        self.active_id().and_then(|id| self.chat(id))
    }

    /// Append a message to a chat.
    fn append_message(&mut self, chat_id: &str, message: Message) -> Result<()> {
        self.chat_mut(chat_id)?.push(message);
        Ok(())
    }

    /// Change a chat's title.
    fn set_title(&mut self, chat_id: &str, title: String) -> Result<()> {
        self.chat_mut(chat_id)?.title = title;
        Ok(())
    }

    /// Mutable lookup that reports unknown ids as errors.
    fn chat_mut(&mut self, chat_id: &str) -> Result<&mut Chat> {
        self.chats_mut()
            .iter_mut()
            .find(|chat| chat.id == chat_id)
            .ok_or_else(|| Error::not_found("no such chat", Some(chat_id.to_string())))
    }

    /// Replace every chat, e.g. after loading a transcript.
    fn replace(&mut self, chats: Vec<Chat>, active_id: Option<String>) {
        let active_id = active_id
            .filter(|id| chats.iter().any(|chat| &chat.id == id))
            .or_else(|| chats.first().map(|chat| chat.id.clone()));
        *self.chats_mut() = chats;
        self.set_active_id(active_id);
    }
}

/// The default store: everything lives in memory for the life of the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    chats: Vec<Chat>,
    active_id: Option<String>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding a single fresh chat, already active.
    pub fn with_new_chat() -> Self {
        let mut store = Self::new();
        store.create_chat();
        store
    }
}

impl SessionStore for InMemoryStore {
    fn chats(&self) -> &[Chat] {
        &self.chats
    }

    fn chats_mut(&mut self) -> &mut Vec<Chat> {
        &mut self.chats
    }

    fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    fn set_active_id(&mut self, id: Option<String>) {
        self.active_id = id;
    }
}

/// On-disk form of an exported set of chats.
#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    #[serde(default)]
    active_id: Option<String>,
    chats: Vec<Chat>,
}

/// Write every chat in `store` to `path` as pretty-printed JSON.
pub fn save_transcript<S: SessionStore + ?Sized, P: AsRef<Path>>(store: &S, path: P) -> Result<()> {
    let transcript = TranscriptFile {
        version: 1,
        active_id: store.active_id().map(str::to_string),
        chats: store.chats().to_vec(),
    };
    let file = File::create(path.as_ref())
        .map_err(|err| Error::io("failed to create transcript file", err))?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, &transcript).map_err(|err| {
        Error::serialization("failed to serialize transcript", Some(Box::new(err)))
    })?;
    writer
        .flush()
        .map_err(|err| Error::io("failed to write transcript file", err))
}

/// Replace the contents of `store` with the chats saved at `path`.
pub fn load_transcript<S: SessionStore + ?Sized, P: AsRef<Path>>(
    store: &mut S,
    path: P,
) -> Result<()> {
    let file = File::open(path.as_ref())
        .map_err(|err| Error::io("failed to open transcript file", err))?;
    let reader = BufReader::new(file);
    let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
        Error::serialization("failed to parse transcript", Some(Box::new(err)))
    })?;
    if transcript.version != 1 {
        return Err(Error::validation(
            format!("unsupported transcript version {}", transcript.version),
            Some("version".to_string()),
        ));
    }
    store.replace(transcript.chats, transcript.active_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chat_is_prepended_and_active() {
        let mut store = InMemoryStore::with_new_chat();
        let first = store.active_id().unwrap().to_string();
        let second = store.create_chat().id.clone();
        assert_eq!(store.chats().len(), 2);
        assert_eq!(store.chats()[0].id, second);
        assert_eq!(store.chats()[1].id, first);
        assert_eq!(store.active_id(), Some(second.as_str()));
    }

    #[test]
    fn select_unknown_chat_fails() {
        let mut store = InMemoryStore::with_new_chat();
        let active = store.active_id().unwrap().to_string();
        let err = store.select_chat("missing").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.active_id(), Some(active.as_str()));
    }

    #[test]
    fn select_changes_active() {
        let mut store = InMemoryStore::with_new_chat();
        let older = store.active_id().unwrap().to_string();
        store.create_chat();
        store.select_chat(&older).unwrap();
        assert_eq!(store.active_chat().unwrap().id, older);
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut store = InMemoryStore::with_new_chat();
        let id = store.active_id().unwrap().to_string();
        for text in ["one", "two", "three"] {
            store.append_message(&id, Message::user(text)).unwrap();
        }
        let contents: Vec<_> = store.chat(&id).unwrap().messages[1..]
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert!(store.append_message("missing", Message::user("x")).is_err());
    }

    #[test]
    fn replace_falls_back_to_first_chat() {
        let mut store = InMemoryStore::new();
        let chats = vec![Chat::new(), Chat::new()];
        let first = chats[0].id.clone();
        store.replace(chats, Some("stale".to_string()));
        assert_eq!(store.active_id(), Some(first.as_str()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn transcript_save_reports_write_failure() {
        let store = InMemoryStore::with_new_chat();
        let err = save_transcript(&store, "/dev/full").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn transcript_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.json");

        let mut store = InMemoryStore::with_new_chat();
        let id = store.active_id().unwrap().to_string();
        store.append_message(&id, Message::user("hello")).unwrap();
        store.set_title(&id, "hello".to_string()).unwrap();
        save_transcript(&store, &path).unwrap();

        let mut loaded = InMemoryStore::new();
        load_transcript(&mut loaded, &path).unwrap();
        assert_eq!(loaded.active_id(), Some(id.as_str()));
        let chat = loaded.active_chat().unwrap();
        assert_eq!(chat.title, "hello");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].content, "hello");
    }

    #[test]
    fn load_missing_transcript_is_io_error() {
        let mut store = InMemoryStore::new();
        let err = load_transcript(&mut store, "/nonexistent/chats.json").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
