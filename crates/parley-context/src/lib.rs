// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-budgeted context assembly for Parley prompts.
//!
//! Builds a bounded "context about the user" block from the knowledge
//! profile, recent meeting summaries, and frequently mentioned entities,
//! caches it for a short TTL, and prepends it to outbound system prompts.

pub mod assembler;
pub mod prompt;
pub mod sections;
pub mod tokens;

pub use assembler::{CONTEXT_FOOTER, CONTEXT_HEADER, ContextAssembler};
pub use prompt::ContextEngine;
pub use tokens::{estimate_tokens, truncate_to_tokens};
