// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-generation service trait (Gemini, echo, mocks).

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::GenerationRequest;

/// Produces an assistant reply for a prompt and its bounded history.
#[async_trait]
pub trait GenerationService: PluginAdapter {
    /// Returns the generated text. An empty or missing candidate set is an
    /// error; the caller decides on the fallback.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ParleyError>;
}
