// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini generation service for Parley.
//!
//! [`GeminiProvider`] implements [`GenerationService`] on top of the
//! `generateContent` REST endpoint. In echo mode it answers `ECHO: <prompt>`
//! without touching the network, which is enough to exercise the whole
//! pipeline locally.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::GeminiConfig;
use parley_core::types::{AdapterType, ChatTurn, GenerationRequest, HealthStatus, Role};
use parley_core::{GenerationService, ParleyError, PluginAdapter};
use tracing::{debug, info, warn};

use crate::client::GeminiClient;
use crate::types::{Content, GenerateContentRequest, GenerationConfig};

/// Environment variable consulted when `gemini.api_key` is unset.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

enum Backend {
    Echo,
    Api(GeminiClient),
}

pub struct GeminiProvider {
    backend: Backend,
    system_prompt: String,
    generation_config: GenerationConfig,
}

impl GeminiProvider {
    /// Build the provider described by `config`.
    ///
    /// The API key comes from `config.api_key`, then `GEMINI_API_KEY`. A key
    /// is only required when echo mode is off.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, ParleyError> {
        let backend = if config.echo {
            info!("Gemini provider in echo mode");
            Backend::Echo
        } else {
            let api_key = resolve_api_key(config.api_key.as_deref())?;
            let client = GeminiClient::new(
                &api_key,
                &config.base_url,
                &config.model,
                Duration::from_secs(config.timeout_secs),
            )?;
            info!(model = %config.model, "Gemini provider initialized");
            Backend::Api(client)
        };

        Ok(Self {
            backend,
            system_prompt: config.system_prompt.clone(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
        })
    }

    /// Provider using an existing client.
    pub fn with_client(client: GeminiClient, config: &GeminiConfig) -> Self {
        Self {
            backend: Backend::Api(client),
            system_prompt: config.system_prompt.clone(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }

    pub fn is_echo(&self) -> bool {
        matches!(self.backend, Backend::Echo)
    }

    /// Request body for `request`: history turns, then the prompt as the
    /// final user turn.
    pub fn build_request(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request.history.iter().map(turn_to_content).collect();
        contents.push(Content::text("user", request.prompt.as_str()));

        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::text("system", self.system_prompt.as_str())),
            generation_config: self.generation_config.clone(),
        }
    }
}

fn turn_to_content(turn: &ChatTurn) -> Content {
    let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    Content::text(role, turn.content.as_str())
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, ParleyError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ParleyError::Config(format!(
            "Gemini API key missing: set gemini.api_key or {API_KEY_ENV}, or enable gemini.echo"
        ))),
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        match self.backend {
            Backend::Echo => "echo",
            Backend::Api(_) => "gemini",
        }
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationService for GeminiProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ParleyError> {
        let client = match &self.backend {
            Backend::Echo => return Ok(format!("ECHO: {}", request.prompt)),
            Backend::Api(client) => client,
        };

        let body = self.build_request(&request);
        debug!(turns = body.contents.len(), model = %client.model(), "calling Gemini");
        let response = client.generate_content(&body).await?;

        match response.first_text() {
            Some(text) => Ok(text.to_string()),
            None => {
                warn!(
                    candidates = response.candidates.len(),
                    "Gemini returned no text candidates"
                );
                Err(ParleyError::Provider {
                    message: "no text candidates in Gemini response".to_string(),
                    source: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn echo_config() -> GeminiConfig {
        GeminiConfig {
            echo: true,
            ..GeminiConfig::default()
        }
    }

    fn request(prompt: &str, history: Vec<ChatTurn>) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            history,
        }
    }

    fn provider_for(server: &MockServer) -> GeminiProvider {
        let config = GeminiConfig {
            api_key: Some("k".into()),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new("k", &server.uri(), &config.model, Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(5));
        GeminiProvider::with_client(client, &config)
    }

    #[tokio::test]
    async fn echo_mode_needs_no_key() {
        let provider = GeminiProvider::from_config(&echo_config()).unwrap();
        assert!(provider.is_echo());
        assert_eq!(provider.name(), "echo");
        let reply = provider.generate(request("Hello", vec![])).await.unwrap();
        assert_eq!(reply, "ECHO: Hello");
    }

    #[test]
    fn history_roles_map_to_user_and_model() {
        let provider = GeminiProvider::from_config(&echo_config()).unwrap();
        let body = provider.build_request(&request(
            "and now?",
            vec![
                ChatTurn {
                    role: Role::User,
                    content: "hi".into(),
                },
                ChatTurn {
                    role: Role::Assistant,
                    content: "hello".into(),
                },
            ],
        ));
        let roles: Vec<&str> = body.contents.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(
            body.contents[2].parts[0].text.as_deref(),
            Some("and now?")
        );
        assert_eq!(body.generation_config.max_output_tokens, 256);
        assert!(body.system_instruction.is_some());
    }

    #[test]
    fn configured_key_wins() {
        assert_eq!(resolve_api_key(Some("abc")).unwrap(), "abc");
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate(request("Hello", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Provider { .. }));
    }

    #[tokio::test]
    async fn sends_system_instruction_and_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"role": "system"},
                "generationConfig": {"maxOutputTokens": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Bonjour"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider_for(&server)
            .generate(request("Hello", vec![]))
            .await
            .unwrap();
        assert_eq!(reply, "Bonjour");
    }
}
