//! Rose AI assistant
//!
//! A prompt-in, text-out client for the Gemini `generateContent` REST API.
//! Every call resolves to display text: a missing key, a failed request and
//! an empty answer each map to a fixed terminal-style reply instead of an
//! error.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::ChatMessage;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f64 = 0.3;

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

pub const OFFLINE_REPLY: &str = "SECURE TERMINAL: API KEY NOT DETECTED. AI MODULE OFFLINE.";
pub const ERROR_REPLY: &str = "SYSTEM ERROR: UNABLE TO PROCESS REQUEST.";
pub const EMPTY_REPLY: &str = "NO DATA RECEIVED.";

pub const SYSTEM_PROMPT: &str = "\
Sen \"Rose AI\"sin, bir savunma sanayi şirketi için geliştirilmiş gelişmiş bir askeri sınıf operasyon asistanısın.
Dilin Türkçe olmalı. Tonun resmi, kısa, analitik, profesyonel ve güvenli olmalı.
Risk analizi, teknik özetler ve operasyonel optimizasyon konularında yardımcı olursun.
Durum göstergesi için kesinlikle gerekli olmadıkça emoji kullanma.
Cevapların sanki bir terminalden geliyormuş gibi net olmalı.
";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Assistant responded {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Build the prompt sent to the model
pub fn full_prompt(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!("CONTEXT: {}\n\nQUERY: {}", ctx, prompt),
        None => prompt.to_string(),
    }
}

/// Render messages as `sender: content` lines
pub fn chat_log<'a>(messages: impl IntoIterator<Item = &'a ChatMessage>) -> String {
    messages
        .into_iter()
        .map(|m| format!("{}: {}", m.sender, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Gemini-backed assistant
#[derive(Debug, Clone)]
pub struct Assistant {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl Assistant {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Create an assistant using the first key found in the environment
    pub fn from_env() -> Result<Self, AssistantError> {
        let key = API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|k| !k.trim().is_empty());
        Self::new(key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Whether an API key is configured
    pub fn is_online(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask the model, always returning display text
    pub async fn generate(&self, prompt: &str, context: Option<&str>) -> String {
        let Some(key) = self.api_key.as_deref() else {
            return OFFLINE_REPLY.to_string();
        };

        match self.request(key, &full_prompt(prompt, context)).await {
            Ok(Some(text)) => text,
            Ok(None) => EMPTY_REPLY.to_string(),
            Err(e) => {
                warn!("AI operations error: {}", e);
                ERROR_REPLY.to_string()
            }
        }
    }

    async fn request(&self, key: &str, prompt: &str) -> Result<Option<String>, AssistantError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!("POST {} ({} prompt chars)", url, prompt.chars().count());

        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": TEMPERATURE },
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text())
    }

    /// Risk assessment for a task description
    pub async fn analyze_task_risk(&self, description: &str) -> String {
        let prompt = format!(
            "Analyze the security and operational risks associated with this task. \
             Provide a bulleted list of potential bottlenecks and a risk score (1-100). Task: {}",
            description
        );
        self.generate(&prompt, None).await
    }

    /// Executive briefing of a chat log
    pub async fn summarize_chat(&self, log: &str) -> String {
        let prompt = format!(
            "Provide a 60-second executive briefing summary of the following communication log. \
             Highlight action items. Log: {}",
            log
        );
        self.generate(&prompt, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    const PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn assistant(server: &MockServer) -> Assistant {
        Assistant::new(Some("test-key".to_string()), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.base_url())
    }

    #[test]
    fn test_full_prompt() {
        assert_eq!(full_prompt("durum?", None), "durum?");
        assert_eq!(
            full_prompt("durum?", Some("3 görev")),
            "CONTEXT: 3 görev\n\nQUERY: durum?"
        );
    }

    #[test]
    fn test_chat_log_lines() {
        let a = ChatMessage::new("RoseAero", "Genel", "Hazır");
        let b = ChatMessage::new("RoseOps", "Genel", "Onay");
        assert_eq!(chat_log([&a, &b]), "RoseAero: Hazır\nRoseOps: Onay");
    }

    #[tokio::test]
    async fn test_offline_without_key() {
        let assistant = Assistant::new(Some("  ".to_string()), Duration::from_secs(1)).unwrap();
        assert!(!assistant.is_online());
        assert_eq!(assistant.generate("x", None).await, OFFLINE_REPLY);
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .query_param("key", "test-key")
                    .body_contains("Rose AI")
                    .body_contains("\"temperature\":0.3")
                    .body_contains("CONTEXT: ctx");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "RİSK " }, { "text": "SKORU: 40" }] }
                    }]
                }));
            })
            .await;

        let reply = assistant(&server).generate("soru", Some("ctx")).await;

        mock.assert_hits_async(1).await;
        assert_eq!(reply, "RİSK SKORU: 40");
    }

    #[tokio::test]
    async fn test_empty_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        assert_eq!(assistant(&server).generate("x", None).await, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_error_reply() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(500).body("boom");
            })
            .await;

        assert_eq!(assistant(&server).generate("x", None).await, ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_risk_prompt_template() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .body_contains("risk score (1-100). Task: Motor montajı");
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
                }));
            })
            .await;

        let reply = assistant(&server).analyze_task_risk("Motor montajı").await;
        mock.assert_hits_async(1).await;
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn test_summary_prompt_template() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .body_contains("Highlight action items. Log: RoseAero: Hazır");
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "brifing" }] } }]
                }));
            })
            .await;

        let reply = assistant(&server).summarize_chat("RoseAero: Hazır").await;
        mock.assert_hits_async(1).await;
        assert_eq!(reply, "brifing");
    }
}
