//! Conversational assistant client
//!
//! The conversation is a plain value owned by the caller: a system prompt
//! plus role-tagged messages in order. [`AssistantClient::reply`] reads it
//! and returns the next assistant message without storing anything.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blocking::BlockingRuntime;
use crate::error::{CloudError, Result};
use crate::http::{error_body, HttpClient, HttpOptions};

/// Groq's OpenAI-compatible API root
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Default system prompt: a coastal-environment assistant for Muara Angke
/// that answers in Indonesian.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Kamu adalah UCUP AI Assistant. \
Jawab pertanyaan seputar mangrove, kualitas air, turbiditas, banjir rob, \
dan lingkungan pesisir Muara Angke. Gunakan bahasa Indonesia yang jelas, \
sederhana, dan terstruktur. Jika ada angka atau indikator, jelaskan maknanya.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// System prompt plus the ordered exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub system_prompt: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { system_prompt: system_prompt.into(), messages: Vec::new() }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    /// Keep only the most recent `max_messages` messages.
    pub fn trim_to(&mut self, max_messages: usize) {
        let excess = self.messages.len().saturating_sub(max_messages);
        self.messages.drain(..excess);
    }

    /// Messages as sent to the model: system prompt first.
    pub fn wire_messages(&self) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage { role: Role::System, content: self.system_prompt.clone() })
            .chain(self.messages.iter().cloned())
            .collect()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Produces the next assistant message for a conversation.
pub trait AssistantClient {
    fn reply(&self, conversation: &Conversation) -> Result<ChatMessage>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible `POST {base}/chat/completions` endpoints.
#[derive(Debug)]
pub struct ChatCompletionsClient {
    base_url: String,
    model: String,
    temperature: f64,
    rt: BlockingRuntime,
    client: HttpClient,
}

impl ChatCompletionsClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, options: HttpOptions) -> Result<Self> {
        if options.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(CloudError::Auth("assistant API key is not set".into()));
        }
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            rt: BlockingRuntime::new()?,
            client: HttpClient::new(options)?,
        })
    }

    /// Groq with the default model.
    pub fn groq(api_key: impl Into<String>) -> Result<Self> {
        let options = HttpOptions { api_key: Some(api_key.into()), ..HttpOptions::default() };
        Self::new(GROQ_BASE_URL, DEFAULT_MODEL, options)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, conversation: &Conversation) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages: conversation.wire_messages(),
            temperature: self.temperature,
        };
        debug!(model = %self.model, messages = body.messages.len(), "requesting completion");
        let resp = self.client.post_json(&url, &body).await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CloudError::Auth(format!("HTTP {status}: {}", error_body(resp).await)));
        }
        if !status.is_success() {
            return Err(CloudError::InvalidRequest(format!("HTTP {status}: {}", error_body(resp).await)));
        }

        let parsed: CompletionResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CloudError::EmptyResult {
                dataset: self.model.clone(),
                reason: "completion contained no message".into(),
            })?;
        info!(model = %self.model, chars = content.len(), "assistant replied");
        Ok(ChatMessage::assistant(content))
    }
}

impl AssistantClient for ChatCompletionsClient {
    fn reply(&self, conversation: &Conversation) -> Result<ChatMessage> {
        if conversation.messages.is_empty() {
            return Err(CloudError::InvalidRequest("conversation has no messages".into()));
        }
        self.rt.block_on(self.complete(conversation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages_start_with_system() {
        let mut c = Conversation::default();
        c.push_user("Berapa luas mangrove 2024?");
        let wire = c.wire_messages();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, Role::System);
        assert_eq!(wire[1], ChatMessage::user("Berapa luas mangrove 2024?"));
    }

    #[test]
    fn test_trim_keeps_latest() {
        let mut c = Conversation::new("sys");
        for i in 0..5 {
            c.push_user(format!("q{i}"));
            c.push(ChatMessage::assistant(format!("a{i}")));
        }
        c.trim_to(3);
        let contents: Vec<_> = c.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a3", "q4", "a4"]);
        c.trim_to(10);
        assert_eq!(c.messages.len(), 3);
    }

    #[test]
    fn test_conversation_json_roundtrip_shape() {
        let json = r#"{"system_prompt":"s","messages":[{"role":"user","content":"hi"}]}"#;
        let c: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(c.messages[0].role, Role::User);
    }

    #[test]
    fn test_request_body_shape() {
        let mut c = Conversation::new("s");
        c.push_user("hi");
        let body = CompletionRequest { model: DEFAULT_MODEL, messages: c.wire_messages(), temperature: 0.3 };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "llama-3.3-70b-versatile");
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        let err = ChatCompletionsClient::new(GROQ_BASE_URL, DEFAULT_MODEL, HttpOptions::default()).unwrap_err();
        assert!(matches!(err, CloudError::Auth(_)));
    }

    #[test]
    #[ignore = "requires GROQ_API_KEY and network access"]
    fn test_live_reply() {
        let key = std::env::var("GROQ_API_KEY").unwrap();
        let client = ChatCompletionsClient::groq(key).unwrap();
        let mut c = Conversation::default();
        c.push_user("Apa itu NDTI?");
        let reply = client.reply(&c).unwrap();
        assert_eq!(reply.role, Role::Assistant);
    }
}
