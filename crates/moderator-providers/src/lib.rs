//! Moderation providers
//!
//! Every backend that classifies content implements `ModerationProvider`.
//! `keyword` runs offline; `openai` and `gemini` call hosted APIs over HTTP.

mod factory;
mod keyword;
mod provider;

#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "openai")]
mod openai;

pub use factory::create_provider;
pub use keyword::{KeywordProvider, INAPPROPRIATE_KEYWORDS};
pub use provider::{parse_json_payload, ModerationAnalysis, ModerationProvider};

#[cfg(feature = "gemini")]
pub use gemini::GeminiProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;
