use crate::core::message::Message;
use serde::{Deserialize, Serialize};

/// Where the backend listens unless a flag or the config says otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5050";

/// Body for `POST /send_message`. The backend replies with a `data: `-framed
/// event stream consumed by the chat stream service.
#[derive(Serialize, Clone)]
pub struct SendMessageRequest {
    pub model_name: String,
    pub history: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

/// One decoded stream record. The fields are not mutually exclusive; a single
/// record may carry any combination of them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StreamRecord {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub ollama: bool,
    #[serde(default)]
    pub providers: Vec<String>,
}

#[derive(Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct RunningModel {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Deserialize)]
pub struct RunningModelsResponse {
    #[serde(default)]
    pub models: Vec<RunningModel>,
}

/// Result shape of the form-posted model lifecycle endpoints.
#[derive(Deserialize)]
pub struct ModelActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub needs_key: bool,
}

#[derive(Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<ProviderInfo>,
    #[serde(default)]
    pub current: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Deserialize)]
pub struct PersonasResponse {
    #[serde(default)]
    pub personas: Vec<PersonaInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct TemplatesResponse {
    #[serde(default)]
    pub templates: Vec<TemplateInfo>,
}

#[derive(Serialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Deserialize)]
pub struct GenerateImageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub loading: bool,
}

#[derive(Serialize)]
pub struct ExecuteCodeRequest {
    pub code: String,
    pub language: String,
}

#[derive(Deserialize)]
pub struct ExecuteCodeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SuggestRepliesRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct SuggestRepliesResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
pub struct SummarizeRequest {
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

pub mod client;

pub use client::ApiClient;
