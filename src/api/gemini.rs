use crate::api::{ScriptSource, body_snippet};
use crate::config::Config;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.gemini_key.clone(),
            model: cfg.gemini_model.clone(),
            base_url: GEMINI_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn gemini_extract_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("Gemini error message: {}", msg));
        }
        if let Some(status) = err.get("status").and_then(|v| v.as_str()) {
            logw(format!("Gemini error status: {}", status));
        }
        return None;
    }

    let candidate = root.get("candidates")?.as_array()?.first()?;
    let parts = candidate.get("content")?.get("parts")?.as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|v| v.as_str()))
        .collect();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            logw(format!("Gemini finish reason: {}", reason));
        }
        return None;
    }
    Some(text.trim().to_string())
}

#[async_trait]
impl ScriptSource for GeminiClient {
    async fn generate_script(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]},
            ],
        });

        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(120))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            logw(format!("Gemini HTTP {}", status.as_u16()));
            if !raw.is_empty() {
                logw(format!("Gemini raw body: {}", body_snippet(&raw)));
            }
            anyhow::bail!("Gemini HTTP {}", status.as_u16());
        }

        let Some(text) = gemini_extract_text(&raw) else {
            logw(format!("Gemini raw body: {}", body_snippet(&raw)));
            anyhow::bail!("Gemini response had no script text");
        };

        logi(format!("Gemini script received: {} words", text.split_whitespace().count()));
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let cfg = Config {
            gemini_key: "test-key".to_string(),
            ..Config::default()
        };
        GeminiClient::new(Client::new(), &cfg).with_base_url(server.uri())
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Did you know "}, {"text": "octopuses have three hearts?\n"}]},
                 "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        assert_eq!(
            gemini_extract_text(raw).as_deref(),
            Some("Did you know octopuses have three hearts?")
        );
    }

    #[test]
    fn error_body_yields_none() {
        let raw = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert!(gemini_extract_text(raw).is_none());
    }

    #[test]
    fn blocked_candidate_yields_none() {
        let raw = r#"{"candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]}"#;
        assert!(gemini_extract_text(raw).is_none());
        assert!(gemini_extract_text("not json").is_none());
    }

    #[tokio::test]
    async fn posts_prompt_and_returns_trimmed_script() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_string_contains("Mind-Blowing Fact"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "  Honey never spoils.\n"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let script = client_for(&server)
            .generate_script(&Config::default().prompt)
            .await
            .unwrap();
        assert_eq!(script, "Honey never spoils.");
    }

    #[tokio::test]
    async fn http_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_script("prompt").await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini HTTP 429");
    }

    #[tokio::test]
    async fn success_without_text_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_script("prompt").await.unwrap_err();
        assert!(err.to_string().contains("no script text"));
    }
}
