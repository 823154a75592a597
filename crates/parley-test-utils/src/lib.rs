// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides a scripted LLM provider and a harness that wires the memory
//! pipeline over a temp SQLite database, so tests never touch the network.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted streaming provider with request capture
//! - [`TestHarness`] - full context-memory stack over a temp database
//! - [`fixtures`] - canned conversations and model responses

pub mod fixtures;
pub mod harness;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_provider::MockProvider;
