//! Gemini API client
//!
//! Implements the `Oracle` trait over the generateContent REST endpoint
//! with function-calling enabled. Uses a long-lived reqwest::Client for
//! connection pooling.

use crate::error::{AssistantError, Result};
use crate::oracle::{Oracle, Part, Turn};
use crate::tools::FunctionDeclaration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Reusable Gemini client (connection-pooled).
pub struct GeminiOracle {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    async fn call(&self, request: &GeminiRequest) -> Result<Vec<Part>> {
        if self.api_key.is_empty() {
            return Err(AssistantError::LlmError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        let response = self.client.post(&url).json(request).send().await.map_err(|e| {
            error!("Gemini API request failed: {}", e);
            AssistantError::LlmError(format!("Gemini API error: {}", e))
        })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AssistantError::LlmError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AssistantError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::LlmError("No response from Gemini API".to_string()))?;

        Ok(candidate.content.parts)
    }

    /// Fire a single-text-prompt request and return the joined text reply.
    async fn call_text(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![Turn::user(vec![Part::text(prompt)])],
            system_instruction: None,
            tools: None,
            generation_config: GenerationConfig::default(),
        };

        let parts = self.call(&request).await?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(AssistantError::LlmError(
                "Empty response from Gemini".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn generate(
        &self,
        history: &[Turn],
        system_instruction: &str,
        tools: &[FunctionDeclaration],
    ) -> Result<Vec<Part>> {
        let request = GeminiRequest {
            contents: history.to_vec(),
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text(system_instruction)],
            }),
            tools: Some(vec![ToolConfig {
                function_declarations: tools.to_vec(),
            }]),
            generation_config: GenerationConfig::default(),
        };

        info!(turns = history.len(), "Calling Gemini API");
        self.call(&request).await
    }

    async fn generate_title(&self, message: &str) -> Result<String> {
        let prompt = format!(
            "Generate a very short, concise title (max 4 words) for a chat that starts \
             with this message: \"{}\". Return ONLY the title, no quotes.",
            message
        );
        Ok(self.call_text(&prompt).await?.trim().to_string())
    }

    async fn suggest_category(&self, title: &str) -> Result<String> {
        let prompt = format!(
            "Categorize this transaction title into one word (e.g., Food, Transport, \
             Utilities, Entertainment, Shopping, Income, Health): \"{}\". \
             Return ONLY the category word.",
            title
        );
        Ok(self.call_text(&prompt).await?.trim().to_string())
    }

    async fn suggest_budget_amount(&self, category: &str, amounts: &[f64]) -> Result<f64> {
        if amounts.is_empty() {
            return Ok(100.0);
        }

        let prompt = format!(
            "Based on these expense amounts for {}: {}, suggest a monthly budget limit \
             as a single number.",
            category,
            json!(amounts)
        );
        let text = self.call_text(&prompt).await?;

        let digits: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let suggested: f64 = digits.parse().unwrap_or(0.0);

        Ok(if suggested > 0.0 { suggested } else { 100.0 })
    }
}

//
// ================= Wire Types =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolConfig>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::advisor_tools;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Turn::user(vec![Part::text("Add 20 at mcdonalds")])],
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text("You are SpendPal")],
            }),
            tools: Some(vec![ToolConfig {
                function_declarations: advisor_tools(),
            }]),
            generation_config: GenerationConfig::default(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["tools"][0]["functionDeclarations"][0]["name"],
            "addTransaction"
        );
        assert!(json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("SpendPal"));
    }

    #[test]
    fn test_response_parsing_with_mixed_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Sure, adding that now." },
                        { "functionCall": { "name": "addTransaction", "args": { "title": "Coffee", "amount": 4.5, "type": "expense", "category": "Food" } } }
                    ]
                }
            }]
        });

        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parts = &response.candidates[0].content.parts;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].text.is_some());
        assert_eq!(
            parts[1].function_call.as_ref().unwrap().name,
            "addTransaction"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let oracle = GeminiOracle::new(String::new()).unwrap();
        let result = oracle.generate(&[], "system", &advisor_tools()).await;
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("GEMINI_API_KEY"));
    }
}
