use std::error::Error;

use crate::api::{
    ExecuteCodeRequest, ExecuteCodeResponse, GenerateImageRequest, GenerateImageResponse,
    HealthResponse, ModelActionResponse, ModelsResponse, PersonasResponse, ProvidersResponse,
    RunningModelsResponse, SuggestRepliesRequest, SuggestRepliesResponse, SummarizeRequest,
    SummarizeResponse, TemplatesResponse,
};
use crate::core::message::Message;
use crate::utils::url::construct_api_url;

/// Thin typed wrapper over the backend's non-streaming endpoints. The
/// streaming `/send_message` path lives in the chat stream service, which
/// borrows this client's reqwest handle.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        construct_api_url(&self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse, Box<dyn Error>> {
        self.get_json("health").await
    }

    pub async fn models(&self) -> Result<Vec<String>, Box<dyn Error>> {
        let response: ModelsResponse = self.get_json("get_models").await?;
        if let Some(error) = response.error {
            return Err(error.into());
        }
        Ok(response.models)
    }

    pub async fn running_models(&self) -> Result<RunningModelsResponse, Box<dyn Error>> {
        self.get_json("ps").await
    }

    pub async fn load_model(&self, model_name: &str) -> Result<(), Box<dyn Error>> {
        self.model_action("load_model", model_name).await
    }

    pub async fn stop_model(&self, model_name: &str) -> Result<(), Box<dyn Error>> {
        self.model_action("stop_model", model_name).await
    }

    pub async fn providers(&self) -> Result<ProvidersResponse, Box<dyn Error>> {
        self.get_json("api/providers").await
    }

    pub async fn personas(&self) -> Result<PersonasResponse, Box<dyn Error>> {
        self.get_json("api/personas").await
    }

    pub async fn templates(&self) -> Result<TemplatesResponse, Box<dyn Error>> {
        self.get_json("api/templates").await
    }

    pub async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse, Box<dyn Error>> {
        // The backend uses 503 for a model that is still loading; the body
        // still carries the structured error, so decode it either way.
        let response = self
            .http
            .post(self.endpoint("api/generate-image"))
            .json(request)
            .send()
            .await?;
        Ok(response.json::<GenerateImageResponse>().await?)
    }

    pub async fn execute_code(
        &self,
        request: &ExecuteCodeRequest,
    ) -> Result<ExecuteCodeResponse, Box<dyn Error>> {
        self.post_json("api/execute-code", request).await
    }

    pub async fn suggest_replies(&self, message: &str) -> Result<Vec<String>, Box<dyn Error>> {
        let request = SuggestRepliesRequest {
            message: message.to_string(),
        };
        let response: SuggestRepliesResponse = self.post_json("api/suggest-replies", &request).await?;
        Ok(response.suggestions)
    }

    pub async fn summarize(&self, messages: Vec<Message>) -> Result<String, Box<dyn Error>> {
        let request = SummarizeRequest { messages };
        let response: SummarizeResponse = self.post_json("api/summarize", &request).await?;
        Ok(response.summary)
    }

    async fn model_action(&self, endpoint: &str, model_name: &str) -> Result<(), Box<dyn Error>> {
        // These two endpoints take form-encoded bodies, not JSON.
        let response = self
            .http
            .post(self.endpoint(endpoint))
            .form(&[("model_name", model_name)])
            .send()
            .await?;
        let result = response.json::<ModelActionResponse>().await?;
        if result.success {
            Ok(())
        } else {
            Err(result
                .error
                .unwrap_or_else(|| "backend reported failure".to_string())
                .into())
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, Box<dyn Error>> {
        let response = self.http.get(self.endpoint(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Box<dyn Error>> {
        let response = self.http.post(self.endpoint(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, Box<dyn Error>> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("request failed with status {status}: {error_text}").into());
        }
        Ok(response.json::<T>().await?)
    }
}
