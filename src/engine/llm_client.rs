use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ui::settings::{Provider, TutorSettings};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API key is missing. Set GEMINI_API_KEY or enter a key in Settings.")]
    MissingApiKey,
    #[error("request to the model provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model provider returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.95,
            max_output_tokens: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Everything a backend needs for one round trip.
pub struct ChatRequest<'a> {
    pub system_instruction: &'a str,
    pub history: &'a [ChatTurn],
    pub params: GenerationParams,
}

/// One hosted chat model. Implementations block until the full reply is in.
pub trait ChatBackend: Send {
    fn generate(&self, request: &ChatRequest<'_>) -> Result<String, LlmError>;

    fn check_connection(&self) -> Result<String, LlmError>;
}

/// A conversation with the model.
///
/// Owned by the engine and passed a backend on every send; there is no
/// process-wide chat handle.
pub struct ChatSession {
    system_instruction: String,
    params: GenerationParams,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(system_instruction: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            params,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Sends one user message. History only grows when the call succeeds.
    pub fn send(&mut self, backend: &dyn ChatBackend, text: &str) -> Result<String, LlmError> {
        self.history.push(ChatTurn {
            role: TurnRole::User,
            text: text.to_string(),
        });

        let request = ChatRequest {
            system_instruction: &self.system_instruction,
            history: &self.history,
            params: self.params,
        };

        match backend.generate(&request) {
            Ok(reply) => {
                self.history.push(ChatTurn {
                    role: TurnRole::Model,
                    text: reply.clone(),
                });
                Ok(reply)
            }
            Err(err) => {
                self.history.pop();
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// Looks up an API key by environment variable name.
pub type KeyLookup = fn(&str) -> Option<String>;

pub fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Picks the backend named in the settings. `env` supplies keys the settings
/// leave empty.
pub fn build_backend(
    settings: &TutorSettings,
    env: KeyLookup,
) -> Result<Box<dyn ChatBackend>, LlmError> {
    let client = Client::builder().build()?;

    match settings.provider {
        Provider::Gemini => {
            let api_key = resolve_api_key(
                settings.api_key.as_deref(),
                &["GEMINI_API_KEY", "API_KEY"],
                env,
            )
            .ok_or(LlmError::MissingApiKey)?;
            Ok(Box::new(GeminiBackend {
                client,
                api_key,
                model: settings.model.clone(),
            }))
        }
        Provider::OpenAiCompatible => Ok(Box::new(OpenAiCompatibleBackend {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: resolve_api_key(settings.api_key.as_deref(), &["OPENAI_API_KEY"], env),
            model: settings.model.clone(),
        })),
    }
}

/// A configured key wins; otherwise the first non-empty variable is used.
fn resolve_api_key(
    configured: Option<&str>,
    vars: &[&str],
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| {
            vars.iter()
                .filter_map(|&name| lookup(name))
                .map(|key| key.trim().to_string())
                .find(|key| !key.is_empty())
        })
}

fn ensure_success(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(LlmError::Status {
        status: status.as_u16(),
        body,
    })
}

/* =========================
   Gemini
   ========================= */

pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_chat(request: &ChatRequest<'a>) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: request.system_instruction,
                }],
            },
            contents: request
                .history
                .iter()
                .map(|turn| Content {
                    role: Some(match turn.role {
                        TurnRole::User => "user",
                        TurnRole::Model => "model",
                    }),
                    parts: vec![Part { text: &turn.text }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                max_output_tokens: request.params.max_output_tokens,
            },
        }
    }
}

impl GenerateContentResponse {
    /// Text of the first candidate. No candidate means an empty reply.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl ChatBackend for GeminiBackend {
    fn generate(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", GEMINI_BASE_URL, self.model);
        let body = GenerateContentRequest::from_chat(request);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let text = ensure_success(response)?
            .json::<GenerateContentResponse>()?
            .into_text();
        debug!(model = %self.model, chars = text.len(), "gemini reply received");
        Ok(text)
    }

    fn check_connection(&self) -> Result<String, LlmError> {
        let url = format!("{}/models/{}", GEMINI_BASE_URL, self.model);
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", &self.api_key)
            .send()?;
        ensure_success(response)?;

        Ok(format!("Connected (model {} available)", self.model))
    }
}

/* =========================
   OpenAI-compatible (LM Studio etc.)
   ========================= */

pub struct OpenAiCompatibleBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_chat(model: &'a str, request: &ChatRequest<'a>) -> Self {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: request.system_instruction,
        });
        messages.extend(request.history.iter().map(|turn| ChatMessage {
            role: match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "assistant",
            },
            content: &turn.text,
        }));

        Self {
            model,
            messages,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            max_tokens: request.params.max_output_tokens,
        }
    }
}

impl OpenAiCompatibleBackend {
    fn authorized(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

impl ChatBackend for OpenAiCompatibleBackend {
    fn generate(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let body = ChatCompletionRequest::from_chat(&self.model, request);
        let response = self
            .authorized(self.client.post(format!("{}/chat/completions", self.base_url)))
            .json(&body)
            .send()?;

        let text = ensure_success(response)?
            .json::<ChatCompletionResponse>()?
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(model = %self.model, chars = text.len(), "chat completion received");
        Ok(text)
    }

    fn check_connection(&self) -> Result<String, LlmError> {
        let response = self
            .authorized(self.client.get(format!("{}/models", self.base_url)))
            .send()?;
        let models = ensure_success(response)?.json::<ModelList>()?;

        Ok(format!("Connected ({} models available)", models.data.len()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    fn turn(role: TurnRole, text: &str) -> ChatTurn {
        ChatTurn {
            role,
            text: text.into(),
        }
    }

    #[test]
    fn successful_send_records_both_turns() {
        let backend = ScriptedBackend::new(vec![Ok("Hello. What would you like?")]);
        let mut chat = ChatSession::new("be a barista", GenerationParams::default());

        let reply = chat.send(&backend, "Start the scene.").unwrap();

        assert_eq!(reply, "Hello. What would you like?");
        assert_eq!(
            chat.history(),
            &[
                turn(TurnRole::User, "Start the scene."),
                turn(TurnRole::Model, "Hello. What would you like?"),
            ]
        );
    }

    #[test]
    fn failed_send_leaves_history_untouched() {
        let backend = ScriptedBackend::new(vec![Ok("Hi."), Err("overloaded")]);
        let mut chat = ChatSession::new("be a barista", GenerationParams::default());
        chat.send(&backend, "hello").unwrap();

        let err = chat.send(&backend, "some coffee").unwrap_err();

        assert!(matches!(err, LlmError::Status { status: 503, .. }));
        assert_eq!(chat.history().len(), 2);
    }

    #[test]
    fn backend_sees_the_whole_conversation() {
        let backend = ScriptedBackend::new(vec![Ok("Hi."), Ok("Sure.")]);
        let calls = backend.calls.clone();
        let mut chat = ChatSession::new("be a barista", GenerationParams::default());
        chat.send(&backend, "hello").unwrap();
        chat.send(&backend, "some tea").unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[1].len(), 3);
        assert_eq!(calls[1][2], turn(TurnRole::User, "some tea"));
    }

    #[test]
    fn reset_clears_history() {
        let backend = ScriptedBackend::new(vec![Ok("Hi.")]);
        let mut chat = ChatSession::new("be a barista", GenerationParams::default());
        chat.send(&backend, "hello").unwrap();

        chat.reset();
        assert!(chat.history().is_empty());
    }

    #[test]
    fn configured_key_wins_over_environment() {
        let lookup = |_: &str| Some("from-env".to_string());

        assert_eq!(
            resolve_api_key(Some(" typed "), &["GEMINI_API_KEY"], lookup),
            Some("typed".to_string())
        );
        assert_eq!(
            resolve_api_key(Some(""), &["GEMINI_API_KEY"], lookup),
            Some("from-env".to_string())
        );
    }

    #[test]
    fn key_lookup_tries_variables_in_order() {
        let lookup = |name: &str| match name {
            "GEMINI_API_KEY" => Some("  ".to_string()),
            "API_KEY" => Some("fallback".to_string()),
            _ => None,
        };

        assert_eq!(
            resolve_api_key(None, &["GEMINI_API_KEY", "API_KEY"], lookup),
            Some("fallback".to_string())
        );
        assert_eq!(resolve_api_key(None, &["OTHER"], lookup), None);
    }

    #[test]
    fn gemini_request_uses_camel_case_and_model_role() {
        let history = vec![turn(TurnRole::User, "hi"), turn(TurnRole::Model, "hello")];
        let request = ChatRequest {
            system_instruction: "rules",
            history: &history,
            params: GenerationParams::default(),
        };

        let json = serde_json::to_value(GenerateContentRequest::from_chat(&request)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "rules");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(json["generationConfig"]["topP"], serde_json::json!(0.95f32));
    }

    #[test]
    fn gemini_response_joins_text_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello. "},{"text":"{}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text(), "Hello. {}");
    }

    #[test]
    fn gemini_response_without_candidates_is_an_empty_reply() {
        for body in [r#"{}"#, r#"{"candidates":[]}"#, r#"{"candidates":[{}]}"#] {
            let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
            assert_eq!(response.into_text(), "", "{body}");
        }
    }

    #[test]
    fn openai_request_puts_system_prompt_first() {
        let history = vec![turn(TurnRole::User, "hi"), turn(TurnRole::Model, "hello")];
        let request = ChatRequest {
            system_instruction: "rules",
            history: &history,
            params: GenerationParams::default(),
        };

        let json =
            serde_json::to_value(ChatCompletionRequest::from_chat("local-model", &request)).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][2]["role"], "assistant");
        assert_eq!(json["max_tokens"], 1000);
    }

    #[test]
    fn configured_gemini_key_builds_a_backend() {
        let settings = TutorSettings {
            api_key: Some("key".into()),
            ..TutorSettings::default()
        };
        assert!(build_backend(&settings, |_| None).is_ok());
    }

    #[test]
    fn gemini_without_any_key_is_rejected() {
        let settings = TutorSettings {
            api_key: Some("   ".into()),
            ..TutorSettings::default()
        };

        assert!(matches!(
            build_backend(&settings, |_| None),
            Err(LlmError::MissingApiKey)
        ));
        assert!(build_backend(&settings, |name| (name == "API_KEY").then(|| "k".into())).is_ok());
    }

    #[test]
    fn local_server_needs_no_key() {
        let settings = TutorSettings {
            provider: Provider::OpenAiCompatible,
            ..TutorSettings::default()
        };
        assert!(build_backend(&settings, |_| None).is_ok());
    }
}
