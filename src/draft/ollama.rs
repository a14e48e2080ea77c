//! Ollama-backed drafting
//!
//! Integrates with a locally running Ollama instance to rewrite spoken
//! intent into a polished message. Requires Ollama to be installed and
//! running.

use super::{validate_draft, DraftResult, Drafter};
use crate::config::GenerationConfig;
use crate::error::GatewayError;
use crate::mode::Language;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sentinel the model is told to emit when the intent is unusable
const ERROR_TEMPLATE: &str = "UNUSABLE";

/// Ollama-based drafter
pub struct OllamaDrafter {
    /// Ollama API endpoint
    url: String,
    /// Model name
    model: String,
    /// Request timeout
    timeout: Duration,
    /// Optional extra context prepended to the prompt (signature style,
    /// recipient hints, etc.)
    context: Option<String>,
}

impl OllamaDrafter {
    /// Create a new Ollama drafter
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            url: config.url.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            context: config.context.clone(),
        }
    }

    /// Check if Ollama is running and the model is available
    pub fn check_availability(&self) -> Result<(), GatewayError> {
        let client = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();

        let tags_url = format!("{}/api/tags", self.url);
        let response = client
            .get(&tags_url)
            .call()
            .map_err(|e| GatewayError::ModelUnavailable(format!("{}: {}", self.url, e)))?;

        #[derive(Deserialize)]
        struct TagsResponse {
            models: Option<Vec<ModelInfo>>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            name: String,
        }

        let tags: TagsResponse = response.into_json().map_err(|e| {
            GatewayError::ModelUnavailable(format!("Failed to parse tags response: {}", e))
        })?;

        let models = tags.models.unwrap_or_default();
        let model_base = self.model.split(':').next().unwrap_or(&self.model);

        let model_available = models.iter().any(|m| {
            let m_base = m.name.split(':').next().unwrap_or(&m.name);
            m_base == model_base || m.name == self.model
        });

        if !model_available {
            tracing::warn!(
                "Model '{}' not found in Ollama. Available models: {:?}",
                self.model,
                models.iter().map(|m| &m.name).collect::<Vec<_>>()
            );
            // Don't fail - Ollama might pull the model on first use
        }

        Ok(())
    }

    /// Build the rewrite prompt for one intent
    fn build_prompt(&self, intent: &str, language: Language) -> String {
        let language_name = match language {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Unknown => "the same language as the input",
        };

        let mut prompt = String::new();
        prompt.push_str(
            "You rewrite dictated speech into a polished written message. \
             Fix grammar and filler words, keep the speaker's meaning and tone, \
             and do not add information that was not said.\n",
        );
        prompt.push_str(&format!("Write the message in {}.\n", language_name));
        prompt.push_str(&format!(
            "Reply with the message text only, no preamble or quotes. \
             If the input is not usable as a message, reply exactly {}.\n",
            ERROR_TEMPLATE
        ));

        if let Some(context) = &self.context {
            prompt.push_str("\nAdditional context about the writer:\n");
            prompt.push_str(context);
            prompt.push('\n');
        }

        prompt.push_str("\nDictated speech:\n");
        prompt.push_str(intent);
        prompt
    }

    /// Call Ollama generate API
    fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let client = ureq::AgentBuilder::new().timeout(self.timeout).build();

        let generate_url = format!("{}/api/generate", self.url);

        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
        }

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!("Calling Ollama generate API with model: {}", self.model);

        let response = client
            .post(&generate_url)
            .send_json(&request)
            .map_err(|e| match e {
                ureq::Error::Transport(ref t) => {
                    let msg = t.to_string();
                    if msg.contains("timed out") || msg.contains("timeout") {
                        GatewayError::ModelUnavailable(format!(
                            "{}: request timed out after {}s",
                            self.url,
                            self.timeout.as_secs()
                        ))
                    } else {
                        GatewayError::ModelUnavailable(format!("{}: {}", self.url, msg))
                    }
                }
                _ => GatewayError::ModelUnavailable(e.to_string()),
            })?;

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
            #[allow(dead_code)]
            done: bool,
        }

        let gen_response: GenerateResponse = response.into_json().map_err(|e| {
            GatewayError::ModelUnavailable(format!("Failed to parse generate response: {}", e))
        })?;

        Ok(gen_response.response)
    }
}

impl Drafter for OllamaDrafter {
    fn draft(&self, intent: &str, language: Language) -> Result<DraftResult, GatewayError> {
        let prompt = self.build_prompt(intent, language);
        tracing::debug!("Drafting prompt ({} chars)", prompt.len());

        let start = std::time::Instant::now();
        let response = self.generate(&prompt)?;
        tracing::debug!(
            "Received draft in {:.2}s ({} chars)",
            start.elapsed().as_secs_f32(),
            response.len()
        );

        validate_draft(&response, ERROR_TEMPLATE)
    }

    fn is_available(&self) -> bool {
        self.check_availability().is_ok()
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GenerationConfig {
        GenerationConfig {
            enabled: true,
            provider: "ollama".to_string(),
            model: "llama3.1:8b".to_string(),
            url: "http://test:11434".to_string(),
            timeout_secs: 60,
            context: None,
        }
    }

    #[test]
    fn test_new_from_config() {
        let drafter = OllamaDrafter::new(&test_config());
        assert_eq!(drafter.url, "http://test:11434");
        assert_eq!(drafter.model, "llama3.1:8b");
        assert_eq!(drafter.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_name() {
        let drafter = OllamaDrafter::new(&test_config());
        assert_eq!(drafter.name(), "ollama");
    }

    #[test]
    fn test_prompt_targets_language() {
        let drafter = OllamaDrafter::new(&test_config());
        let prompt = drafter.build_prompt("recuerda comprar leche", Language::Es);
        assert!(prompt.contains("Spanish"));
        assert!(prompt.contains("recuerda comprar leche"));
    }

    #[test]
    fn test_prompt_includes_context() {
        let mut config = test_config();
        config.context = Some("Sign messages as Sam.".to_string());
        let drafter = OllamaDrafter::new(&config);
        let prompt = drafter.build_prompt("hello", Language::En);
        assert!(prompt.contains("Sign messages as Sam."));
    }
}
