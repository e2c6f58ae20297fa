//! Chat sessions: the persisted transcript plus what the UI shows.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::agent_loop::{AgentLoop, LoopOutput};
use crate::error::Result;
use crate::types::{Message, Role};

/// First assistant line of every session.
pub const GREETING: &str = "Hey, how can I help you today?";

/// One rendered chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub role: Role,
    /// Markdown content.
    pub content: String,
}

impl DisplayEntry {
    /// Speaker label for plain-text rendering.
    pub fn role_label(&self) -> &'static str {
        match self.role {
            Role::User => "You",
            _ => "Assistant",
        }
    }
}

/// A conversation with the assistant.
///
/// The transcript is what the model sees on the next turn; the display
/// history only holds user prompts and final answers. Both change only when a
/// turn succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    transcript: Vec<Message>,
    display_history: Vec<DisplayEntry>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            transcript: vec![Message::assistant(GREETING)],
            display_history: vec![DisplayEntry {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn display_history(&self) -> &[DisplayEntry] {
        &self.display_history
    }

    /// Text of the most recent assistant message.
    pub fn latest_answer(&self) -> Option<&str> {
        self.transcript.iter().rev().find_map(|m| match m {
            Message::Assistant { content, tool_calls } if tool_calls.is_empty() => {
                Some(content.as_str())
            }
            _ => None,
        })
    }

    /// Run one turn. On failure the session is left exactly as it was.
    pub async fn submit(&mut self, agent: &AgentLoop, prompt: &str) -> Result<LoopOutput> {
        let mut transcript = self.transcript.clone();
        transcript.push(Message::user(prompt));

        let output = agent.run(transcript).await?;

        self.transcript = output.transcript.clone();
        self.display_history.push(DisplayEntry {
            role: Role::User,
            content: prompt.to_string(),
        });
        self.display_history.push(DisplayEntry {
            role: Role::Assistant,
            content: output.answer().to_string(),
        });
        Ok(output)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), messages = self.transcript.len(), "session saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `path` when the file exists, otherwise start fresh.
    pub fn load_or_new(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }
}

/// Shared handle to a session; holding the lock serialises submissions.
pub type SessionHandle = Arc<Mutex<ChatSession>>;

/// Manages multiple named chat sessions.
///
/// The map lock is held only to look up a handle, so turns on different
/// sessions run concurrently while turns on one session queue up.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: StdMutex<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        // Only handles live here; a poisoned map is still usable.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session under a fresh id.
    pub fn create(&self) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let handle = self.get_or_create(&id);
        (id, handle)
    }

    /// Get or create a session by ID.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        self.sessions()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ChatSession::new())))
            .clone()
    }

    /// Get an existing session.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions().get(session_id).cloned()
    }

    /// Remove a session.
    pub fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions().remove(session_id)
    }

    /// List session IDs.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions().keys().cloned().collect()
    }

    /// Submit a prompt to a named session, waiting for any turn already in flight.
    pub async fn submit(
        &self,
        session_id: &str,
        agent: &AgentLoop,
        prompt: &str,
    ) -> Result<LoopOutput> {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock().await;
        session.submit(agent, prompt).await
    }
}
