use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{GenerationError, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` client for the hosted Gemini API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

fn request_body(system_prompt: &str, message: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": system_prompt }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": message }]
        }],
        "generationConfig": {
            "temperature": 0.7
        }
    })
}

/// Concatenated text parts of the first candidate.
fn extract_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, system_prompt: &str, message: &str) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(self.url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body(system_prompt, message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), model = %self.model, "Gemini request failed");
            return Err(GenerationError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.without_url().to_string()))?;

        let text = extract_text(&body)
            .ok_or_else(|| GenerationError::Malformed("no text in first candidate".into()))?;
        debug!(model = %self.model, chars = text.len(), "Gemini reply received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_joined_candidate_text() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] }
            }]
        });
        assert_eq!(extract_text(&body).as_deref(), Some("Hello there"));
    }

    #[test]
    fn blocked_reply_has_no_text() {
        let body = json!({ "candidates": [], "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(extract_text(&body), None);
    }

    #[test]
    fn url_targets_configured_model() {
        let client = GeminiClient::new(
            "k".into(),
            "gemini-2.0-flash".into(),
            Some("http://localhost:9999/".into()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[actix_web::test]
    async fn transport_errors_never_carry_the_api_key() {
        let client = GeminiClient::new(
            "SUPER-SECRET-KEY".into(),
            "gemini-2.0-flash".into(),
            Some("http://127.0.0.1:1".into()),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.generate("Be brief", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Transport(_) | GenerationError::Timeout
        ));
        assert!(!err.to_string().contains("SUPER-SECRET-KEY"));
    }

    #[test]
    fn system_prompt_travels_as_instruction() {
        let body = request_body("Be brief", "How many leave days?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "How many leave days?");
    }
}
