use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::AiProvider;
use crate::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_INPUT_CHARS: usize = 100_000;
// Generation is slower than a page download, so it gets its own deadline
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

fn summary_prompt(text: &str) -> String {
    format!("Please summarize the following news article text:\n\n{text}")
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
    status: Option<String>,
}

/// Turn a generateContent response into summary text or an error
fn parse_response(status: StatusCode, body: &str) -> Result<String> {
    let parsed: Option<GeminiResponse> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let reason = parsed
            .and_then(|r| r.error)
            .map(|e| match e.status {
                Some(s) => format!("{} ({})", e.message, s),
                None => e.message,
            })
            .unwrap_or_else(|| truncate_chars(body, 200).to_string());
        return Err(Error::Summarization(format!(
            "Gemini API returned HTTP {}: {}",
            status, reason
        )));
    }

    let response = parsed.ok_or_else(|| {
        Error::Summarization("Failed to parse Gemini response".to_string())
    })?;

    if let Some(error) = response.error {
        return Err(Error::Summarization(format!("Gemini API error: {}", error.message)));
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::Summarization(format!(
            "Gemini API: content generation blocked. Reason: {}",
            reason
        )));
    }

    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| Error::Summarization(
            "Gemini API: content generation blocked. Reason: Unknown".to_string(),
        ))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Summarization(format!(
            "Gemini API: no content generated (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text.to_string())
}

/// Gemini API provider
pub struct GeminiApiProvider {
    client: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiApiProvider {
    pub fn new(client: Client, api_key: &str, model: &str, max_output_tokens: u32) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_output_tokens,
        }
    }

    fn build_request(&self, prompt: String) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: 0.7,
            },
        }
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(GENERATE_TIMEOUT)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| Error::Summarization(format!("Gemini API request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Summarization(format!("Failed to read Gemini response: {}", e)))?;

        parse_response(status, &body)
    }
}

#[async_trait::async_trait]
impl AiProvider for GeminiApiProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, content: &str) -> Result<String> {
        let total_chars = content.chars().count();
        if total_chars > MAX_INPUT_CHARS {
            tracing::warn!(
                "Text length ({}) exceeds {} chars, truncating for summarization",
                total_chars,
                MAX_INPUT_CHARS
            );
        }

        let truncated = truncate_chars(content, MAX_INPUT_CHARS);
        tracing::info!("Summarizing text with Gemini (length: {})", truncated.chars().count());

        self.generate(summary_prompt(truncated)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let provider = GeminiApiProvider::new(Client::new(), "key", "gemini-2.0-flash", 512);
        let request = provider.build_request(summary_prompt("Some article."));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "Please summarize the following news article text:\n\nSome article."
        );
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_parse_success_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"A short "},{"text":"summary."}],"role":"model"},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), "A short summary.");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = parse_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, Error::Summarization(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn test_parse_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = parse_response(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_parse_non_json_error_body() {
        let err = parse_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_parse_empty_candidate() {
        let body = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        let err = parse_response(StatusCode::OK, body).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
