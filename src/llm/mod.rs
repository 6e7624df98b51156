pub mod client;

pub use client::{Completer, LlmClient};
