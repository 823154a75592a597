// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for streaming LLM integrations.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderStreamChunk};

/// A stream of response chunks. Dropping it cancels the underlying request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ProviderStreamChunk, ParleyError>> + Send>>;

/// Adapter for LLM provider integrations.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    /// Sends a request and returns a stream of response chunks.
    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ParleyError>;
}
