//! Google Gemini `generateContent` client used for weekly insights.

use anyhow::{Context, Result, bail};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use fitlog_core::error::FitlogError;
use fitlog_core::insight::{CompletionService, Prompt};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

// -- Request types --

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

// -- Response types --

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("Gemini API key is required");
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: GEMINI_ENDPOINT.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn build_request_body(prompt: &Prompt) -> GenerateRequest<'_> {
        GenerateRequest {
            contents: vec![Content {
                role: &prompt.role,
                parts: vec![RequestPart { text: &prompt.text }],
            }],
        }
    }

    /// Concatenated text parts of the first candidate.
    pub fn extract_text(response: &GenerateResponse) -> Option<String> {
        let text: String = response
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl CompletionService for GeminiClient {
    async fn complete(&self, prompt: &Prompt) -> fitlog_core::error::Result<String> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        debug!(model = %self.model, chars = prompt.text.len(), "Gemini request");

        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| FitlogError::AiService(format!("Invalid API key header: {e}")))?;
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header("x-goog-api-key", key)
            .json(&Self::build_request_body(prompt))
            .send()
            .await
            .map_err(|e| FitlogError::AiService(format!("Gemini API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(200).collect();
            return Err(FitlogError::AiService(format!(
                "Gemini API error {status}: {truncated}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FitlogError::AiService(format!("Failed to parse Gemini response: {e}")))?;

        Self::extract_text(&parsed)
            .ok_or_else(|| FitlogError::AiService("Gemini response contained no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, extract::Path};

    fn prompt() -> Prompt {
        Prompt {
            role: "user".to_string(),
            text: "How am I doing?".to_string(),
        }
    }

    #[test]
    fn test_build_request_body() {
        let p = prompt();
        let body = serde_json::to_value(GeminiClient::build_request_body(&p)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "How am I doing?");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Keep it up. "}, {"text": "Sleep early."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(
            GeminiClient::extract_text(&response).as_deref(),
            Some("Keep it up. Sleep early.")
        );
    }

    #[test]
    fn test_extract_text_empty() {
        let none: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(GeminiClient::extract_text(&none).is_none());

        let blocked: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(GeminiClient::extract_text(&blocked).is_none());
    }

    #[test]
    fn test_new_empty_api_key() {
        assert!(GeminiClient::new("  ", "gemini-1.5-flash").is_err());
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta/models")
    }

    #[tokio::test]
    async fn test_complete_against_local_endpoint() {
        async fn generate(
            Path(call): Path<String>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            assert_eq!(call, "test-model:generateContent");
            assert_eq!(headers.get("x-goog-api-key").unwrap(), "k123");
            let echoed = body["contents"][0]["parts"][0]["text"].as_str().unwrap().to_string();
            Json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": format!("echo: {echoed}")}]}}]
            }))
        }

        let endpoint = serve(Router::new().route("/v1beta/models/{call}", post(generate))).await;
        let client = GeminiClient::new("k123", "test-model")
            .unwrap()
            .with_endpoint(&endpoint);
        let text = client.complete(&prompt()).await.unwrap();
        assert_eq!(text, "echo: How am I doing?");
    }

    #[tokio::test]
    async fn test_complete_error_status_is_ai_error() {
        async fn quota() -> (axum::http::StatusCode, &'static str) {
            (axum::http::StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
        }

        let endpoint = serve(Router::new().route("/v1beta/models/{call}", post(quota))).await;
        let client = GeminiClient::new("k", "m").unwrap().with_endpoint(&endpoint);
        let err = client.complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, FitlogError::AiService(ref m) if m.contains("429")), "{err}");
    }

    #[tokio::test]
    #[ignore = "hits the Gemini API"]
    async fn test_complete_live() {
        let key = std::env::var("GEMINI_API_KEY").unwrap();
        let client = GeminiClient::new(&key, crate::config::DEFAULT_GEMINI_MODEL).unwrap();
        let text = client.complete(&prompt()).await.unwrap();
        assert!(!text.is_empty());
    }
}
