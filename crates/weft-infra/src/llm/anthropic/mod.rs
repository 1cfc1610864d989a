//! Anthropic Messages API provider.

mod client;
mod streaming;
mod types;

pub use client::AnthropicProvider;
