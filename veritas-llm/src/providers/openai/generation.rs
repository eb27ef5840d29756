//! Text generation with ordered model fallback

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, Message};
use async_trait::async_trait;
use tracing::{debug, warn};
use veritas_core::{
    GenerationRequest, GenerationResponse, GenerationService, UpstreamError, UpstreamResult,
};

/// Generation provider over an OpenAI-compatible chat completions endpoint.
///
/// Each request carries its own candidate list; models are tried in order
/// and the first non-empty completion wins.
pub struct OpenAIGenerationProvider {
    client: OpenAIClient,
}

impl OpenAIGenerationProvider {
    pub fn new(client: OpenAIClient) -> Self {
        Self { client }
    }

    fn build_request(request: &GenerationRequest, model: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system.trim().is_empty() {
            messages.push(Message::system(request.system.clone()));
        }
        messages.push(Message::user(request.prompt.clone()));

        CompletionRequest {
            model: model.to_string(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
        }
    }
}

#[async_trait]
impl GenerationService for OpenAIGenerationProvider {
    async fn generate(&self, request: &GenerationRequest) -> UpstreamResult<GenerationResponse> {
        for model in &request.models {
            let body = Self::build_request(request, model);
            let result: UpstreamResult<CompletionResponse> =
                self.client.request("chat/completions", body).await;

            match result {
                Ok(response) => match response.first_content().map(str::trim) {
                    Some(text) if !text.is_empty() => {
                        debug!(model = %model, "generation succeeded");
                        return Ok(GenerationResponse {
                            text: text.to_string(),
                            model_used: model.clone(),
                        });
                    }
                    _ => warn!(model = %model, "empty completion, trying next model"),
                },
                Err(e) => warn!(model = %model, error = %e, "generation failed, trying next model"),
            }
        }

        Err(UpstreamError::AllModelsFailed {
            models: request.models.clone(),
        })
    }
}

impl std::fmt::Debug for OpenAIGenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIGenerationProvider")
            .field("client", &self.client)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: &str) -> GenerationRequest {
        GenerationRequest {
            system: system.to_string(),
            prompt: "Is the sky green?".to_string(),
            models: vec!["a".to_string(), "b".to_string()],
            temperature: 0.0,
            max_tokens: 50,
        }
    }

    #[test]
    fn test_build_request_includes_system_when_present() {
        let body = OpenAIGenerationProvider::build_request(&request("Be terse."), "a");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.model, "a");
        assert_eq!(body.max_tokens, Some(50));
    }

    #[test]
    fn test_build_request_omits_blank_system() {
        let body = OpenAIGenerationProvider::build_request(&request("  "), "b");
        assert_eq!(body.messages, vec![Message::user("Is the sky green?")]);
    }

    #[tokio::test]
    async fn test_no_candidates_is_all_models_failed() {
        let key = secrecy::SecretString::from("k".to_string());
        let provider = OpenAIGenerationProvider::new(OpenAIClient::new("generation", key, 60));
        let mut req = request("");
        req.models.clear();
        let err = provider.generate(&req).await.unwrap_err();
        assert_eq!(err, UpstreamError::AllModelsFailed { models: vec![] });
    }
}
