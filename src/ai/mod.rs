//! Text-generation gateway client
//!
//! Thin proxy to an OpenAI-compatible chat-completions endpoint. The gateway
//! is treated as unreliable: any failure maps to a generic AI-service error
//! at the API boundary with the diagnostic logged here.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;

/// Errors from the text-generation gateway
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI gateway key is not configured")]
    NotConfigured,

    #[error("Gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected gateway response: {0}")]
    BadResponse(String),
}

/// Structured suggestion returned by the material-science assist endpoint.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
}

/// Client for the OpenAI-compatible text-generation gateway
#[derive(Clone)]
pub struct TextGenClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl TextGenClient {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ai_gateway_url.clone(),
            config.ai_gateway_key.clone(),
            config.ai_model.clone(),
        )
    }

    /// Send a single prompt and return the completion text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_ref().ok_or(AiError::NotConfigured)?;

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: serde_json::Value = response.json().await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AiError::BadResponse("missing choices[0].message.content".to_string()))?;

        Ok(content.trim().to_string())
    }

    /// Send a prompt expected to yield a `{title, description}` JSON object.
    pub async fn generate_suggestion(&self, prompt: &str) -> Result<Suggestion, AiError> {
        let text = self.generate(prompt).await?;

        serde_json::from_str(&text)
            .map_err(|e| AiError::BadResponse(format!("not a title/description object: {}", e)))
    }
}

/// Prompt for NFT monetization tips.
pub fn monetization_tips_prompt(title: &str, description: &str) -> String {
    format!(
        "Generate monetization tips for an NFT with the title \"{}\" and description: \"{}\". \
         Provide 3-5 practical tips for monetizing this NFT.",
        title, description
    )
}

/// Prompt for NFT image descriptions.
pub fn image_description_prompt(prompt: &str) -> String {
    format!(
        "Generate a detailed description for an AI-generated image based on this prompt: \"{}\". \
         Return only the image description.",
        prompt
    )
}

/// Prompt for material-science submission suggestions.
pub fn material_assist_prompt(topic: &str) -> String {
    format!(
        "Generate a detailed material science submission about \"{}\". Include:\n\
         1. A concise title\n\
         2. A comprehensive description covering key properties, applications, and innovations\n\
         3. Practical applications and use cases\n\
         Format the response as JSON with keys: title, description",
        topic
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_without_key_fails() {
        let client = TextGenClient::new(
            "https://gateway.invalid/v1".to_string(),
            None,
            "test-model".to_string(),
        );

        let result = client.generate("hello").await;
        assert!(matches!(result, Err(AiError::NotConfigured)));
    }

    #[test]
    fn test_suggestion_parses_expected_shape() {
        let raw = r#"{"title": "Graphene", "description": "A 2D carbon lattice."}"#;
        let suggestion: Suggestion = serde_json::from_str(raw).unwrap();
        assert_eq!(suggestion.title, "Graphene");
    }

    #[test]
    fn test_prompts_embed_inputs() {
        assert!(monetization_tips_prompt("Art", "desc").contains("\"Art\""));
        assert!(image_description_prompt("a fox").contains("a fox"));
        assert!(material_assist_prompt("aerogels").contains("aerogels"));
    }
}
