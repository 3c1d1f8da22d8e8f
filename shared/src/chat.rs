//! First-aid chat session.
//!
//! The session is a tagged state (`Idle` / `Pending`) plus one transition
//! function, [`ChatSession::apply`]. At most one request is in flight; the
//! transcript only ever grows, except on an explicit reset while idle.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::UnixTimeMs;

pub const GREETING: &str = "Ask me first aid related questions";

pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "How to treat a burn?",
    "Someone is fainted",
    "Help with bleeding wound",
];

const CONNECTION_TROUBLE: &str = "Sorry, I'm having trouble connecting. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalStep {
    pub step_number: u32,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Structured first-aid answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalResponse {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub steps: Vec<MedicalStep>,
    #[serde(default)]
    pub additional_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_action: Option<String>,
}

/// Renders a structured answer as plain text with light markdown emphasis.
#[must_use]
pub fn format_medical_response(response: &MedicalResponse) -> String {
    let mut out = format!("**{}**\n\n", response.title);

    if let Some(overview) = response.overview.as_deref().filter(|o| !o.is_empty()) {
        let _ = write!(out, "{overview}\n\n");
    }

    if !response.warnings.is_empty() {
        out.push_str("⚠️ **WARNINGS:**\n");
        for warning in &response.warnings {
            let _ = writeln!(out, "• {warning}");
        }
        out.push('\n');
    }

    if !response.steps.is_empty() {
        out.push_str("📋 **STEPS:**\n");
        for step in &response.steps {
            let _ = write!(out, "{}. {}", step.step_number, step.instruction);
            if let Some(details) = step.details.as_deref().filter(|d| !d.is_empty()) {
                let _ = write!(out, " - {details}");
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !response.additional_notes.is_empty() {
        out.push_str("💡 **ADDITIONAL NOTES:**\n");
        for note in &response.additional_notes {
            let _ = writeln!(out, "• {note}");
        }
        out.push('\n');
    }

    if let Some(action) = response.emergency_action.as_deref().filter(|a| !a.is_empty()) {
        let _ = writeln!(out, "🚨 **EMERGENCY ACTION:**\n{action}");
    }

    out
}

/// Content of one chat message.
///
/// Deserializes from the chat collaborator's `response` field: an object with
/// `title` and `steps` is a structured answer, a string is plain text, and
/// anything else is kept as its JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Text(String),
    Medical(MedicalResponse),
}

impl MessageBody {
    /// What text-to-speech reads for this message.
    #[must_use]
    pub fn spoken_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Medical(response) => format_medical_response(response),
        }
    }
}

impl<'de> Deserialize<'de> for MessageBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(text) => Ok(Self::Text(text)),
            serde_json::Value::Object(ref map)
                if map.contains_key("title") && map.contains_key("steps") =>
            {
                serde_json::from_value(value)
                    .map(Self::Medical)
                    .map_err(serde::de::Error::custom)
            }
            other => Ok(Self::Text(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSource {
    pub intent: String,
    pub similarity: f64,
    pub source: String,
}

/// Body of a successful `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: MessageBody,
    #[serde(default)]
    pub sources: Vec<ChatSource>,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub body: MessageBody,
    pub timestamp: UnixTimeMs,
}

impl ChatMessage {
    fn new(sender: Sender, body: MessageBody, timestamp: UnixTimeMs) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            body,
            timestamp,
        }
    }

    fn greeting(timestamp: UnixTimeMs) -> Self {
        Self::new(Sender::Assistant, MessageBody::Text(GREETING.to_string()), timestamp)
    }
}

/// Correlates a reply with the submit that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRequestId(u64);

impl std::fmt::Display for ChatRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chat-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Pending { request_id: ChatRequestId },
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Submit(String),
    Reply {
        request_id: ChatRequestId,
        outcome: Result<ChatResponse, ApiError>,
    },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyMessage,
    RequestPending,
    NotPending,
    StaleReply,
}

/// Result of applying one [`ChatInput`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A user message was appended and this request must be sent.
    Started {
        request_id: ChatRequestId,
        request: ChatRequest,
    },
    /// The assistant answer was appended.
    Succeeded(ChatMessage),
    /// An error message was appended in place of an answer.
    Failed(ChatMessage),
    /// The transcript was cleared back to the greeting.
    Cleared,
    /// Nothing changed.
    Rejected(Rejection),
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    transcript: Vec<ChatMessage>,
    phase: ChatPhase,
    next_request: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(UnixTimeMs::now())
    }
}

impl ChatSession {
    #[must_use]
    pub fn new(now: UnixTimeMs) -> Self {
        Self {
            transcript: vec![ChatMessage::greeting(now)],
            phase: ChatPhase::Idle,
            next_request: 0,
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    #[must_use]
    pub const fn phase(&self) -> ChatPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.phase, ChatPhase::Pending { .. })
    }

    /// True while the transcript holds nothing but the greeting.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.transcript.len() <= 1
    }

    pub fn submit(&mut self, text: &str, now: UnixTimeMs) -> Transition {
        self.apply(ChatInput::Submit(text.to_string()), now)
    }

    pub fn complete(
        &mut self,
        request_id: ChatRequestId,
        outcome: Result<ChatResponse, ApiError>,
        now: UnixTimeMs,
    ) -> Transition {
        self.apply(ChatInput::Reply { request_id, outcome }, now)
    }

    pub fn reset(&mut self, now: UnixTimeMs) -> Transition {
        self.apply(ChatInput::Reset, now)
    }

    pub fn apply(&mut self, input: ChatInput, now: UnixTimeMs) -> Transition {
        match (self.phase, input) {
            (ChatPhase::Pending { .. }, ChatInput::Submit(_)) => {
                debug!("submit ignored while a request is pending");
                Transition::Rejected(Rejection::RequestPending)
            }
            (ChatPhase::Idle, ChatInput::Submit(text)) => {
                let message = text.trim();
                if message.is_empty() {
                    return Transition::Rejected(Rejection::EmptyMessage);
                }

                self.next_request += 1;
                let request_id = ChatRequestId(self.next_request);
                self.transcript.push(ChatMessage::new(
                    Sender::User,
                    MessageBody::Text(message.to_string()),
                    now,
                ));
                self.phase = ChatPhase::Pending { request_id };
                info!(%request_id, chars = message.chars().count(), "chat request started");

                Transition::Started {
                    request_id,
                    request: ChatRequest {
                        message: message.to_string(),
                    },
                }
            }
            (ChatPhase::Idle, ChatInput::Reply { request_id, .. }) => {
                warn!(%request_id, "chat reply arrived with no request pending");
                Transition::Rejected(Rejection::NotPending)
            }
            (ChatPhase::Pending { request_id: current }, ChatInput::Reply { request_id, .. })
                if current != request_id =>
            {
                warn!(%request_id, %current, "stale chat reply ignored");
                Transition::Rejected(Rejection::StaleReply)
            }
            (ChatPhase::Pending { request_id }, ChatInput::Reply { outcome, .. }) => {
                self.phase = ChatPhase::Idle;
                match outcome {
                    Ok(reply) => {
                        let message = ChatMessage::new(Sender::Assistant, reply.response, now);
                        info!(%request_id, sources = reply.sources.len(), "chat reply received");
                        self.transcript.push(message.clone());
                        Transition::Succeeded(message)
                    }
                    Err(error) => {
                        warn!(
                            %request_id,
                            error = %error,
                            status = ?error.status,
                            "chat request failed"
                        );
                        let text = format!("{CONNECTION_TROUBLE} Error: {}", error.message);
                        let message =
                            ChatMessage::new(Sender::Assistant, MessageBody::Text(text), now);
                        self.transcript.push(message.clone());
                        Transition::Failed(message)
                    }
                }
            }
            (ChatPhase::Pending { .. }, ChatInput::Reset) => {
                debug!("reset ignored while a request is pending");
                Transition::Rejected(Rejection::RequestPending)
            }
            (ChatPhase::Idle, ChatInput::Reset) => {
                self.transcript = vec![ChatMessage::greeting(now)];
                info!("chat transcript reset");
                Transition::Cleared
            }
        }
    }
}
