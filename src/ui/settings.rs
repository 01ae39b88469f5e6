use serde::{Deserialize, Serialize};

use crate::engine::llm_client::GenerationParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Google Generative Language API.
    #[default]
    Gemini,
    /// Any `/chat/completions` server, e.g. LM Studio.
    OpenAiCompatible,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAiCompatible => "OpenAI-compatible",
        }
    }
}

/// User-editable configuration, persisted as JSON by `settings_io`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorSettings {
    pub provider: Provider,
    pub model: String,

    /// Falls back to the environment when empty.
    pub api_key: Option<String>,

    /// Only used by [`Provider::OpenAiCompatible`].
    pub base_url: String,

    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,

    pub ui_scale: f32,
}

impl Default for TutorSettings {
    fn default() -> Self {
        let generation = GenerationParams::default();
        Self {
            provider: Provider::Gemini,
            model: "gemini-2.5-flash".into(),
            api_key: None,
            base_url: "http://localhost:1234/v1".into(),
            temperature: generation.temperature,
            top_p: generation.top_p,
            max_output_tokens: generation.max_output_tokens,
            ui_scale: 1.0,
        }
    }
}

impl TutorSettings {
    pub fn generation(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: TutorSettings =
            serde_json::from_str(r#"{"provider":"open_ai_compatible","temperature":0.5}"#).unwrap();

        assert_eq!(settings.provider, Provider::OpenAiCompatible);
        assert_eq!(settings.temperature, 0.5);
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.max_output_tokens, 1000);
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn generation_mirrors_the_sampling_fields() {
        let settings = TutorSettings {
            temperature: 0.7,
            top_p: 0.5,
            max_output_tokens: 256,
            ..TutorSettings::default()
        };

        assert_eq!(
            settings.generation(),
            GenerationParams {
                temperature: 0.7,
                top_p: 0.5,
                max_output_tokens: 256,
            }
        );
    }
}
