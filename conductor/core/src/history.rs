//! Chat History Mirror
//!
//! Optional persistence of conversations. The conversation itself never
//! depends on it: writes are queued to a single background worker, which
//! applies them in order and only logs failures.
//!
//! Records mirror the hosted schema: a chat row with a status, and message
//! rows tagged with their sender.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::messages::SessionId;
use crate::session::Message;

/// Chat lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Conversation in progress
    Active,
    /// Conversation closed
    Archived,
}

/// Who wrote a stored message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The student
    User,
    /// The assistant
    Bot,
}

/// A stored message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message ID
    pub id: String,
    /// Message text
    pub content: String,
    /// Author
    pub sender: Sender,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for StoredMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.0.clone(),
            content: message.text.clone(),
            sender: if message.is_user { Sender::User } else { Sender::Bot },
            timestamp: message.timestamp,
        }
    }
}

/// A stored chat with its messages
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Chat ID (the session ID)
    pub id: String,
    /// When the chat started
    pub started_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: ChatStatus,
    /// Messages in timestamp order
    pub messages: Vec<StoredMessage>,
}

impl ChatRecord {
    fn new(id: &SessionId) -> Self {
        Self {
            id: id.0.clone(),
            started_at: Utc::now(),
            status: ChatStatus::Active,
            messages: Vec::new(),
        }
    }
}

/// History storage failures
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Filesystem failure
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt record
    #[error("history record error: {0}")]
    Serde(#[from] serde_json::Error),

    /// No such chat
    #[error("unknown chat: {0}")]
    UnknownChat(String),
}

/// Storage behind the mirror
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create an active chat; creating an existing chat is a no-op
    async fn create_chat(&self, chat_id: &SessionId) -> Result<(), HistoryError>;

    /// Append a message to a chat
    async fn append(&self, chat_id: &SessionId, message: StoredMessage) -> Result<(), HistoryError>;

    /// Load a chat, if it exists
    async fn load(&self, chat_id: &SessionId) -> Result<Option<ChatRecord>, HistoryError>;

    /// Change a chat's status
    async fn set_status(&self, chat_id: &SessionId, status: ChatStatus) -> Result<(), HistoryError>;
}

/// In-memory store (tests, ephemeral sessions)
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    chats: Mutex<HashMap<String, ChatRecord>>,
}

impl MemoryHistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn create_chat(&self, chat_id: &SessionId) -> Result<(), HistoryError> {
        self.chats
            .lock()
            .entry(chat_id.0.clone())
            .or_insert_with(|| ChatRecord::new(chat_id));
        Ok(())
    }

    async fn append(&self, chat_id: &SessionId, message: StoredMessage) -> Result<(), HistoryError> {
        let mut chats = self.chats.lock();
        let chat = chats
            .get_mut(&chat_id.0)
            .ok_or_else(|| HistoryError::UnknownChat(chat_id.0.clone()))?;
        chat.messages.push(message);
        Ok(())
    }

    async fn load(&self, chat_id: &SessionId) -> Result<Option<ChatRecord>, HistoryError> {
        Ok(self.chats.lock().get(&chat_id.0).cloned())
    }

    async fn set_status(&self, chat_id: &SessionId, status: ChatStatus) -> Result<(), HistoryError> {
        let mut chats = self.chats.lock();
        let chat = chats
            .get_mut(&chat_id.0)
            .ok_or_else(|| HistoryError::UnknownChat(chat_id.0.clone()))?;
        chat.status = status;
        Ok(())
    }
}

/// One JSON file per chat under a directory
#[derive(Clone, Debug)]
pub struct JsonFileHistoryStore {
    dir: PathBuf,
}

impl JsonFileHistoryStore {
    /// Store chats under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chat_path(&self, chat_id: &SessionId) -> PathBuf {
        let safe: String = chat_id
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    async fn read(&self, chat_id: &SessionId) -> Result<Option<ChatRecord>, HistoryError> {
        match tokio::fs::read(self.chat_path(chat_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, record: &ChatRecord, chat_id: &SessionId) -> Result<(), HistoryError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.chat_path(chat_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn update(
        &self,
        chat_id: &SessionId,
        change: impl FnOnce(&mut ChatRecord) + Send,
    ) -> Result<(), HistoryError> {
        let mut record = self
            .read(chat_id)
            .await?
            .ok_or_else(|| HistoryError::UnknownChat(chat_id.0.clone()))?;
        change(&mut record);
        self.write(&record, chat_id).await
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn create_chat(&self, chat_id: &SessionId) -> Result<(), HistoryError> {
        if self.read(chat_id).await?.is_some() {
            return Ok(());
        }
        self.write(&ChatRecord::new(chat_id), chat_id).await
    }

    async fn append(&self, chat_id: &SessionId, message: StoredMessage) -> Result<(), HistoryError> {
        self.update(chat_id, |record| record.messages.push(message)).await
    }

    async fn load(&self, chat_id: &SessionId) -> Result<Option<ChatRecord>, HistoryError> {
        self.read(chat_id).await
    }

    async fn set_status(&self, chat_id: &SessionId, status: ChatStatus) -> Result<(), HistoryError> {
        self.update(chat_id, |record| record.status = status).await
    }
}

enum MirrorOp {
    Create(SessionId),
    Append(SessionId, StoredMessage),
    Status(SessionId, ChatStatus),
    Flush(oneshot::Sender<()>),
}

/// Background writer that mirrors a conversation into a [`HistoryStore`]
#[derive(Debug)]
pub struct HistoryMirror {
    queue: mpsc::UnboundedSender<MirrorOp>,
    worker: JoinHandle<()>,
}

impl HistoryMirror {
    /// Spawn the worker
    pub fn spawn(store: Arc<dyn HistoryStore>) -> Self {
        let (queue, mut rx) = mpsc::unbounded_channel::<MirrorOp>();

        let worker = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let (chat_id, result) = match op {
                    MirrorOp::Create(id) => {
                        let result = store.create_chat(&id).await;
                        (id, result)
                    }
                    MirrorOp::Append(id, message) => {
                        let result = store.append(&id, message).await;
                        (id, result)
                    }
                    MirrorOp::Status(id, status) => {
                        let result = store.set_status(&id, status).await;
                        (id, result)
                    }
                    MirrorOp::Flush(done) => {
                        let _ = done.send(());
                        continue;
                    }
                };
                if let Err(e) = result {
                    tracing::warn!(chat_id = %chat_id, error = %e, "History write failed");
                }
            }
            tracing::debug!("History mirror stopped");
        });

        Self { queue, worker }
    }

    fn enqueue(&self, op: MirrorOp) {
        if self.queue.send(op).is_err() {
            tracing::warn!("History mirror is gone, dropping write");
        }
    }

    /// Record the start of a chat
    pub fn chat_started(&self, chat_id: &SessionId) {
        self.enqueue(MirrorOp::Create(chat_id.clone()));
    }

    /// Record a message
    pub fn message(&self, chat_id: &SessionId, message: &Message) {
        self.enqueue(MirrorOp::Append(chat_id.clone(), StoredMessage::from(message)));
    }

    /// Mark a chat archived
    pub fn archive(&self, chat_id: &SessionId) {
        self.enqueue(MirrorOp::Status(chat_id.clone(), ChatStatus::Archived));
    }

    /// Wait until every queued write has been applied
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.enqueue(MirrorOp::Flush(done));
        let _ = wait.await;
    }

    /// Apply everything queued, then stop the worker
    pub async fn shutdown(self) {
        let Self { queue, worker } = self;
        drop(queue);
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "History mirror worker failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_mirror_preserves_order() {
        let store = Arc::new(MemoryHistoryStore::new());
        let mirror = HistoryMirror::spawn(store.clone());
        let chat = SessionId::new();

        mirror.chat_started(&chat);
        mirror.message(&chat, &Message::user("hola"));
        mirror.message(&chat, &Message::bot("¿cómo estás?", true));
        mirror.archive(&chat);
        mirror.shutdown().await;

        let record = store.load(&chat).await.unwrap().unwrap();
        let contents: Vec<_> = record.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hola", "¿cómo estás?"]);
        assert_eq!(record.messages[0].sender, Sender::User);
        assert_eq!(record.messages[1].sender, Sender::Bot);
        assert_eq!(record.status, ChatStatus::Archived);
    }

    #[tokio::test]
    async fn test_mirror_survives_store_errors() {
        let store = Arc::new(MemoryHistoryStore::new());
        let mirror = HistoryMirror::spawn(store.clone());
        let chat = SessionId::new();

        // Append before create fails inside the worker but is only logged
        mirror.message(&chat, &Message::user("perdido"));
        mirror.chat_started(&chat);
        mirror.message(&chat, &Message::user("guardado"));
        mirror.flush().await;

        let record = store.load(&chat).await.unwrap().unwrap();
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.messages[0].content, "guardado");
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHistoryStore::new(dir.path().join("history"));
        let chat = SessionId::new();

        assert_eq!(store.load(&chat).await.unwrap(), None);
        store.create_chat(&chat).await.unwrap();
        store.append(&chat, StoredMessage::from(&Message::user("hola"))).await.unwrap();
        store.create_chat(&chat).await.unwrap();
        store.set_status(&chat, ChatStatus::Archived).await.unwrap();

        let reopened = JsonFileHistoryStore::new(dir.path().join("history"));
        let record = reopened.load(&chat).await.unwrap().unwrap();
        assert_eq!(record.id, chat.0);
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.status, ChatStatus::Archived);
    }

    #[tokio::test]
    async fn test_json_store_unknown_chat() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHistoryStore::new(dir.path());
        let err = store
            .set_status(&SessionId::new(), ChatStatus::Archived)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::UnknownChat(_)));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatStatus::Archived).unwrap(), "\"archived\"");
    }
}
