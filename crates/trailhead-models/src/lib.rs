//! Model-runtime adapters for trailhead.
//!
//! Loads configuration, resolves deployment profiles into concrete settings,
//! and provides the HTTP adapters that implement the embedding and
//! generation ports against Ollama and OpenAI-compatible APIs.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
mod http;
pub mod ollama;
pub mod openai;
pub mod profile;
pub mod resilience;
pub mod wiring;

pub use config::{Config, Settings};
pub use profile::{Profile, Provider};
pub use resilience::{RateLimiter, Resilient, RetryPolicy};
pub use wiring::{build_ports, Ports};
