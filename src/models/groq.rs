//! Groq-hosted model definitions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Groq models with tool-calling support.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
pub enum GroqModel {
    #[strum(serialize = "llama-3.1-8b-instant")]
    Llama31_8bInstant,
    #[strum(serialize = "llama-3.3-70b-versatile")]
    Llama33_70bVersatile,
    #[strum(serialize = "openai/gpt-oss-20b")]
    GptOss20b,
    #[strum(serialize = "openai/gpt-oss-120b")]
    GptOss120b,
    #[strum(default)]
    Custom(String),
}

impl GroqModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Llama31_8bInstant => "llama-3.1-8b-instant",
            Self::Llama33_70bVersatile => "llama-3.3-70b-versatile",
            Self::GptOss20b => "openai/gpt-oss-20b",
            Self::GptOss120b => "openai/gpt-oss-120b",
            Self::Custom(s) => s,
        }
    }
}
