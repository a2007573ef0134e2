use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use super::{map_send_error, GenerationError};
use crate::core::config::ApiKey;

/// Google Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: ApiKey,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: String,
        model: String,
        api_key: ApiKey,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if api_key.is_empty() {
            return Err(GenerationError::MissingCredential(
                "GOOGLE_API_KEY or llm.api_key is required for the Gemini provider".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, GenerationError> {
        let body = build_request_body(&request);

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        extract_text(&payload)
    }
}

fn build_request_body(request: &ChatRequest) -> Value {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();

    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| {
            let role = if m.role == "assistant" { "model" } else { "user" };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut generation_config = serde_json::Map::new();
    if let Some(t) = request.temperature {
        generation_config.insert("temperature".to_string(), json!(t));
    }
    if let Some(max) = request.max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(max));
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": generation_config,
    });
    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
    }
    body
}

fn extract_text(payload: &Value) -> Result<String, GenerationError> {
    let text: String = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = payload["promptFeedback"]["blockReason"]
            .as_str()
            .or_else(|| payload["candidates"][0]["finishReason"].as_str())
            .unwrap_or("no candidates");
        return Err(GenerationError::EmptyResponse(reason.to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn request_body_carries_system_instruction_and_temperature() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("What reduces fever?"),
        ])
        .with_temperature(0.4)
        .with_max_tokens(Some(256));

        let body = build_request_body(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["temperature"], json!(0.4));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(256));
    }

    #[test]
    fn text_parts_are_concatenated() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Aspirin " }, { "text": "helps." }] } }]
        });
        assert_eq!(extract_text(&payload).unwrap(), "Aspirin helps.");
    }

    #[test]
    fn blocked_prompt_is_an_empty_response() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        match extract_text(&payload) {
            Err(GenerationError::EmptyResponse(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let result = GeminiProvider::new(
            "https://example.invalid".to_string(),
            "gemini-flash-latest".to_string(),
            ApiKey::new(""),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(GenerationError::MissingCredential(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_gemini_connection() {
        let key = std::env::var("GOOGLE_API_KEY").expect("GOOGLE_API_KEY set");
        let provider = GeminiProvider::new(
            crate::core::config::defaults::GEMINI_BASE_URL.to_string(),
            "gemini-flash-latest".to_string(),
            ApiKey::new(key),
            Duration::from_secs(60),
        )
        .unwrap();

        let req = ChatRequest::new(vec![ChatMessage::user("Hello")]).with_temperature(0.4);
        match provider.chat(req).await {
            Ok(response) => println!("Gemini Response: {}", response),
            Err(e) => panic!("Gemini error: {}", e),
        }
    }
}
