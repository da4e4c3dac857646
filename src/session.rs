use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use log::{ info, warn };
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use thiserror::Error;
use uuid::Uuid;

use crate::config::prompt::PromptConfig;
use crate::history::ConversationBuffer;
use crate::markdown::{ escape_html, render };
use crate::models::chat::{ ChatMessage, Role };
use crate::models::event::StreamEvent;

pub const WELCOME_MESSAGE: &str = "Hello! I'm your career guidance assistant. I can help you explore career options, \
provide guidance on career paths, and even draft a comprehensive career guide for any \
specific career choice you're interested in. How can I assist you today?";

pub const FALLBACK_MESSAGE: &str = "I apologize, but I'm currently unable to connect to the career guidance service. \
This might be due to network issues or service maintenance. \
Please try again in a few moments.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("reply stream ended before the completion marker")]
    Incomplete,
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ChatError>> + Send>>;

/// The generation collaborator as a session sees it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat_stream(
        &self,
        message: &str,
        history: &[ChatMessage]
    ) -> Result<EventStream, ChatError>;

    async fn generate_guide(&self, career: &str) -> Result<String, ChatError>;
}

/// A transcript entry ready for display. Assistant text is rendered markdown;
/// user text is escaped and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub role: Role,
    pub html: String,
}

impl DisplayMessage {
    pub fn user(text: &str) -> Self {
        Self { role: Role::User, html: escape_html(text) }
    }

    pub fn assistant(text: &str) -> Self {
        Self { role: Role::Assistant, html: render(text) }
    }
}

/// Read-only view of a session's request-in-flight flag.
#[derive(Debug, Clone)]
pub struct BusyHandle(Arc<AtomicBool>);

impl BusyHandle {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One interactive conversation: its history buffer, what has been shown,
/// and whether a request is outstanding.
pub struct ChatSession {
    id: Uuid,
    backend: Arc<dyn ChatBackend>,
    prompts: PromptConfig,
    buffer: ConversationBuffer,
    transcript: Vec<DisplayMessage>,
    in_flight: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let id = Uuid::new_v4();
        info!("Started chat session {}", id);
        Self {
            id,
            backend,
            prompts: PromptConfig::default(),
            buffer: ConversationBuffer::default(),
            transcript: vec![DisplayMessage::assistant(WELCOME_MESSAGE)],
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.buffer = ConversationBuffer::with_capacity(capacity);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn transcript(&self) -> &[DisplayMessage] {
        &self.transcript
    }

    pub fn busy_handle(&self) -> BusyHandle {
        BusyHandle(Arc::clone(&self.in_flight))
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn send(&mut self, input: &str) -> Option<DisplayMessage> {
        self.send_with(input, |_| {}).await
    }

    /// Sends `input` and streams the reply, calling `on_chunk` for each
    /// fragment as it arrives. Blank input does nothing and returns `None`.
    pub async fn send_with<F>(&mut self, input: &str, on_chunk: F) -> Option<DisplayMessage>
        where F: FnMut(&str) + Send
    {
        let message = input.trim();
        if message.is_empty() {
            return None;
        }

        let history = self.buffer.messages();
        self.buffer.append(ChatMessage::user(message));
        self.transcript.push(DisplayMessage::user(message));

        let reply = {
            let _guard = InFlight::enter(&self.in_flight);
            stream_reply(self.backend.as_ref(), message, &history, on_chunk).await
        };

        let shown = match reply {
            Ok(text) => {
                let shown = DisplayMessage::assistant(&text);
                self.buffer.append(ChatMessage::assistant(text));
                shown
            }
            Err(e) => {
                warn!("Session {}: chat request failed: {}", self.id, e);
                DisplayMessage::assistant(FALLBACK_MESSAGE)
            }
        };
        self.transcript.push(shown.clone());
        Some(shown)
    }

    pub async fn generate_guide(&mut self, career: &str) -> Option<DisplayMessage> {
        let career = career.trim();
        if career.is_empty() {
            return None;
        }

        let result = {
            let _guard = InFlight::enter(&self.in_flight);
            self.backend.generate_guide(career).await
        };

        let shown = match result {
            Ok(guide) => {
                let intro = format!("Here's your comprehensive career guide for {}:", career);
                self.transcript.push(DisplayMessage::assistant(&intro));
                let shown = DisplayMessage::assistant(&guide);
                self.buffer.append(ChatMessage::user(self.prompts.guide_request(career)));
                self.buffer.append(ChatMessage::assistant(guide));
                shown
            }
            Err(e) => {
                warn!("Session {}: guide request for '{}' failed: {}", self.id, career, e);
                DisplayMessage::assistant(FALLBACK_MESSAGE)
            }
        };
        self.transcript.push(shown.clone());
        Some(shown)
    }

    pub async fn exam_recommendations(&mut self, career: &str) -> Option<DisplayMessage> {
        let career = career.trim();
        if career.is_empty() {
            return None;
        }

        let request = self.prompts.exam_request(career);
        let history = self.buffer.messages();
        let reply = {
            let _guard = InFlight::enter(&self.in_flight);
            stream_reply(self.backend.as_ref(), &request, &history, |_| {}).await
        };

        let shown = match reply {
            Ok(text) => {
                let intro = format!("Here are exam recommendations for {}:", career);
                self.transcript.push(DisplayMessage::assistant(&intro));
                let shown = DisplayMessage::assistant(&text);
                self.buffer.append(ChatMessage::user(request));
                self.buffer.append(ChatMessage::assistant(text));
                shown
            }
            Err(e) => {
                warn!("Session {}: exam request for '{}' failed: {}", self.id, career, e);
                DisplayMessage::assistant(FALLBACK_MESSAGE)
            }
        };
        self.transcript.push(shown.clone());
        Some(shown)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.transcript = vec![DisplayMessage::assistant(WELCOME_MESSAGE)];
        info!("Session {} cleared", self.id);
    }
}

/// Collects chunks in arrival order until the completion marker.
async fn stream_reply<F>(
    backend: &dyn ChatBackend,
    message: &str,
    history: &[ChatMessage],
    mut on_chunk: F
) -> Result<String, ChatError>
    where F: FnMut(&str) + Send
{
    let mut events = backend.chat_stream(message, history).await?;
    let mut reply = String::new();
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Chunk { content } => {
                on_chunk(&content);
                reply.push_str(&content);
            }
            StreamEvent::Complete { .. } => {
                return Ok(reply);
            }
            StreamEvent::Error { content } => {
                return Err(ChatError::Upstream(content));
            }
        }
    }
    Err(ChatError::Incomplete)
}
