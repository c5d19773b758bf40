// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use parley_core::ParleyError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse};

/// Gemini API client with one retry on transient statuses.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl GeminiClient {
    /// Build a client sending `api_key` in the `x-goog-api-key` header.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ParleyError> {
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| ParleyError::Config(format!("invalid Gemini API key header value: {e}")))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Wait between a transient failure and its retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_error(&self, context: &str, e: reqwest::Error) -> ParleyError {
        if e.is_timeout() {
            return ParleyError::Timeout {
                duration: self.timeout,
            };
        }
        ParleyError::Provider {
            message: format!("{context}: {e}"),
            source: Some(Box::new(e)),
        }
    }

    /// POST `request` and decode the response.
    ///
    /// 429, 500, 503 and 504 are retried once; any other non-success status
    /// fails immediately with the API's error message. A request exceeding
    /// the client timeout fails with [`ParleyError::Timeout`].
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ParleyError> {
        let url = self.endpoint();
        let mut attempt = 0;

        loop {
            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| self.request_error("HTTP request failed", e))?;

            let status = response.status();
            debug!(status = %status, attempt, model = %self.model, "generateContent response");

            if status.is_success() {
                return response
                    .json::<GenerateContentResponse>()
                    .await
                    .map_err(|e| self.request_error("failed to parse Gemini response", e));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, attempt, "transient Gemini error, retrying");
                attempt += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api) => format!(
                    "Gemini API error {} ({}): {}",
                    api.error.code, api.error.status, api.error.message
                ),
                Err(_) => format!("Gemini API returned {status}: {body}"),
            };
            return Err(ParleyError::Provider {
                message,
                source: None,
            });
        }
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 504)
}
