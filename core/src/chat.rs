//! LLM-backed trainer chat: transcript management, error taxonomy, and
//! debounced persistence of the conversation to the remote store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{ChatConversation, ChatMessage, ChatRole, new_id};
use crate::sync::RemoteStore;

/// Quiet period before a changed transcript is written to the remote store.
pub const SAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// System prompt establishing the trainer persona.
pub const TRAINER_PERSONA: &str = "\
You are \"Your Personal Trainer\", an evidence-based fitness and nutrition coach.

CORE IDENTITY:
- You are a professional trainer with deep knowledge of exercise science, nutrition science, and human physiology.
- You base recommendations on peer-reviewed research, not opinions or trends.

COMMUNICATION STYLE:
- Be authoritative yet approachable.
- Acknowledge when multiple valid approaches exist, and be honest about uncertainty.
- Provide actionable, practical advice and encourage safe, progressive training.
- Warn against dangerous practices or misinformation.

RESPONSE GUIDELINES:
- Prioritize safety and long-term health over quick fixes.
- Consider individual context (goals, experience, limitations).
- Keep responses informative but concise (2-4 paragraphs unless more detail is requested).";

/// Greeting shown when a user has no saved conversation yet.
pub const WELCOME_MESSAGE: &str = "Hi! I'm Your Personal Trainer. I'm here to help you with \
fitness, nutrition, training, and diet questions. What would you like to know?";

#[derive(Debug, Error)]
pub enum ChatError {
    /// Rejected before any remote call is attempted.
    #[error("Messages are required")]
    EmptyConversation,
    #[error("The chat backend is not configured. Set an API key to talk to your trainer.")]
    NotConfigured,
    #[error(
        "Our AI trainer hit the provider's usage limit. Please try again shortly, or check your provider plan and billing details."
    )]
    RateLimited,
    #[error("{0}")]
    Backend(String),
}

/// A chat completion provider: given the conversation so far (the persona
/// prompt is the implementation's concern), produce one assistant reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

/// Synchronous validation applied before any backend call.
pub fn validate_messages(messages: &[ChatMessage]) -> Result<(), ChatError> {
    if messages.is_empty() {
        return Err(ChatError::EmptyConversation);
    }
    Ok(())
}

/// One user's trainer conversation. Loads the existing transcript
/// (first-or-create), appends exchanges, and saves changes to the remote
/// store after a quiet period. A backend failure becomes a synthetic
/// assistant message, so the transcript always stays well-formed.
pub struct TrainerSession {
    conversation: ChatConversation,
    save_tx: mpsc::Sender<ChatConversation>,
    saver: JoinHandle<()>,
}

impl TrainerSession {
    pub async fn open(remote: Arc<dyn RemoteStore>, user_id: &str) -> Self {
        let conversation = match remote.load_conversation(user_id).await {
            Ok(Some(existing)) if !existing.messages.is_empty() => existing,
            Ok(_) => fresh_conversation(user_id),
            Err(e) => {
                log::error!("Failed to load trainer conversation: {e:#}");
                fresh_conversation(user_id)
            }
        };

        let (save_tx, save_rx) = mpsc::channel(16);
        let saver = tokio::spawn(run_saver(remote, user_id.to_string(), save_rx));

        TrainerSession {
            conversation,
            save_tx,
            saver,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.conversation.messages
    }

    #[must_use]
    pub fn conversation(&self) -> &ChatConversation {
        &self.conversation
    }

    /// Append the user's message, ask the backend for a reply, and append
    /// the assistant's answer. Errors surface as an inline assistant
    /// message rather than propagating.
    pub async fn send(&mut self, backend: &dyn ChatBackend, text: &str) -> ChatMessage {
        self.push(ChatRole::User, text.trim());

        let reply = match validate_messages(&self.conversation.messages) {
            Ok(()) => backend.complete(&self.conversation.messages).await,
            Err(e) => Err(e),
        };
        let content = match reply {
            Ok(content) => content,
            Err(e) => format!("Sorry, I'm having trouble responding right now. {e}"),
        };

        self.push(ChatRole::Assistant, &content)
    }

    fn push(&mut self, role: ChatRole, content: &str) -> ChatMessage {
        let message = ChatMessage {
            id: new_id(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        self.conversation.messages.push(message.clone());
        self.conversation.updated_at = message.timestamp;
        // Queue a debounced save; a full queue just means an older snapshot
        // is still pending and the next push will carry this change too.
        if let Err(e) = self.save_tx.try_send(self.conversation.clone()) {
            log::debug!("Transcript save queue full: {e}");
        }
        message
    }

    /// Flush any pending save and stop the saver task.
    pub async fn close(self) {
        drop(self.save_tx);
        let _ = self.saver.await;
    }
}

fn fresh_conversation(user_id: &str) -> ChatConversation {
    let now = Utc::now();
    ChatConversation {
        id: new_id(),
        user_id: user_id.to_string(),
        messages: vec![ChatMessage {
            id: new_id(),
            role: ChatRole::Assistant,
            content: WELCOME_MESSAGE.to_string(),
            timestamp: now,
        }],
        created_at: now,
        updated_at: now,
    }
}

async fn run_saver(
    remote: Arc<dyn RemoteStore>,
    user_id: String,
    mut rx: mpsc::Receiver<ChatConversation>,
) {
    while let Some(mut latest) = rx.recv().await {
        // Absorb further updates until the transcript goes quiet.
        loop {
            match tokio::time::timeout(SAVE_DEBOUNCE, rx.recv()).await {
                Ok(Some(newer)) => latest = newer,
                Ok(None) => {
                    save(remote.as_ref(), &user_id, &latest).await;
                    return;
                }
                Err(_) => break,
            }
        }
        save(remote.as_ref(), &user_id, &latest).await;
    }
}

async fn save(remote: &dyn RemoteStore, user_id: &str, conversation: &ChatConversation) {
    if let Err(e) = remote.save_conversation(user_id, conversation).await {
        log::error!("Failed to save trainer conversation: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DiaryEntry, FoodItem, MacroTargets, UserProfile, WeightEntry, WorkoutSession,
    };
    use crate::sync::{RemoteChange, Subscription};
    use anyhow::Result;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
            let last = messages.last().ok_or(ChatError::EmptyConversation)?;
            Ok(format!("You said: {}", last.content))
        }
    }

    struct FailingBackend(ChatError);

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ChatError> {
            Err(match &self.0 {
                ChatError::EmptyConversation => ChatError::EmptyConversation,
                ChatError::NotConfigured => ChatError::NotConfigured,
                ChatError::RateLimited => ChatError::RateLimited,
                ChatError::Backend(msg) => ChatError::Backend(msg.clone()),
            })
        }
    }

    #[derive(Default)]
    struct ConversationStore {
        stored: Mutex<Option<ChatConversation>>,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for ConversationStore {
        async fn load_profile(&self, _u: &str) -> Result<Option<UserProfile>> {
            Ok(None)
        }
        async fn load_targets(&self, _u: &str) -> Result<Option<MacroTargets>> {
            Ok(None)
        }
        async fn load_weights(&self, _u: &str) -> Result<Vec<WeightEntry>> {
            Ok(vec![])
        }
        async fn load_foods(&self, _u: &str) -> Result<Vec<FoodItem>> {
            Ok(vec![])
        }
        async fn load_diary(&self, _u: &str) -> Result<Vec<DiaryEntry>> {
            Ok(vec![])
        }
        async fn load_workouts(&self, _u: &str) -> Result<Vec<WorkoutSession>> {
            Ok(vec![])
        }
        async fn push_profile(&self, _u: &str, _p: Option<&UserProfile>) -> Result<()> {
            Ok(())
        }
        async fn push_targets(&self, _u: &str, _t: Option<&MacroTargets>) -> Result<()> {
            Ok(())
        }
        async fn replace_weights(&self, _u: &str, _e: &[WeightEntry]) -> Result<()> {
            Ok(())
        }
        async fn replace_foods(&self, _u: &str, _e: &[FoodItem]) -> Result<()> {
            Ok(())
        }
        async fn replace_diary(&self, _u: &str, _e: &[DiaryEntry]) -> Result<()> {
            Ok(())
        }
        async fn replace_workouts(&self, _u: &str, _e: &[WorkoutSession]) -> Result<()> {
            Ok(())
        }
        async fn load_conversation(&self, _u: &str) -> Result<Option<ChatConversation>> {
            Ok(self.stored.lock().unwrap().clone())
        }
        async fn save_conversation(&self, _u: &str, c: &ChatConversation) -> Result<()> {
            *self.stored.lock().unwrap() = Some(c.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn subscribe(&self, _u: &str) -> Subscription {
            let (_tx, rx) = tokio::sync::mpsc::channel::<RemoteChange>(1);
            Subscription::new(rx)
        }
    }

    #[tokio::test]
    async fn test_fresh_session_starts_with_welcome() {
        let remote = Arc::new(ConversationStore::default());
        let session = TrainerSession::open(remote, "u1").await;
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::Assistant);
        assert_eq!(messages[0].content, WELCOME_MESSAGE);
        session.close().await;
    }

    #[tokio::test]
    async fn test_existing_conversation_is_resumed() {
        let remote = Arc::new(ConversationStore::default());
        {
            let mut session = TrainerSession::open(Arc::clone(&remote) as _, "u1").await;
            session.send(&EchoBackend, "hello").await;
            session.close().await;
        }
        assert!(remote.stored.lock().unwrap().is_some());

        let session = TrainerSession::open(Arc::clone(&remote) as _, "u1").await;
        // welcome + user + assistant from the first session
        assert_eq!(session.messages().len(), 3);
        session.close().await;
    }

    #[tokio::test]
    async fn test_send_appends_user_and_assistant() {
        let remote = Arc::new(ConversationStore::default());
        let mut session = TrainerSession::open(remote, "u1").await;

        let reply = session.send(&EchoBackend, "  How much protein?  ").await;
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "You said: How much protein?");

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "How much protein?");
        session.close().await;
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_assistant_message() {
        let remote = Arc::new(ConversationStore::default());
        let mut session = TrainerSession::open(remote, "u1").await;

        let reply = session
            .send(&FailingBackend(ChatError::Backend("boom".to_string())), "hi")
            .await;
        assert_eq!(reply.role, ChatRole::Assistant);
        assert!(reply.content.contains("Sorry, I'm having trouble responding right now."));
        assert!(reply.content.contains("boom"));

        // The transcript stays well-formed: user message then error bubble.
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[2].role, ChatRole::Assistant);
        session.close().await;
    }

    #[tokio::test]
    async fn test_rate_limit_has_distinct_wording() {
        let remote = Arc::new(ConversationStore::default());
        let mut session = TrainerSession::open(remote, "u1").await;
        let reply = session.send(&FailingBackend(ChatError::RateLimited), "hi").await;
        assert!(reply.content.contains("usage limit"));
        session.close().await;
    }

    #[test]
    fn test_validate_messages_rejects_empty() {
        assert!(matches!(
            validate_messages(&[]),
            Err(ChatError::EmptyConversation)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_are_debounced() {
        let remote = Arc::new(ConversationStore::default());
        let mut session = TrainerSession::open(Arc::clone(&remote) as _, "u1").await;

        session.send(&EchoBackend, "one").await;
        session.send(&EchoBackend, "two").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // Four queued snapshots collapsed into a single write.
        assert_eq!(remote.saves.load(Ordering::SeqCst), 1);
        let stored = remote.stored.lock().unwrap().clone().unwrap();
        assert_eq!(stored.messages.len(), 5);
        session.close().await;
    }
}
