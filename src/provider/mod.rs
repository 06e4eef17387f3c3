pub mod stats;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A hosted generative model: prompt in, free text out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini `generateContent` over HTTPS.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            model,
            base_url,
            http,
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl TextModel for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("GEMINI_API_KEY is not configured");
        }

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("request to Gemini API failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Gemini API error: {} - {}", status, text);
        }

        let data = resp
            .json::<GenerateContentResponse>()
            .await
            .context("invalid response JSON from Gemini API")?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(anyhow!("Gemini API returned no text"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider(base_url: String, api_key: &str) -> GeminiProvider {
        GeminiProvider::new(
            api_key.to_string(),
            "gemini-test".to_string(),
            base_url,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn joins_text_parts_of_first_candidate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                Matcher::Regex(r"^/models/gemini-test:generateContent".into()),
            )
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{ "parts": [{ "text": "hello" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"Judgment: No"},{"text":"\nAlternatives: A"}]}}]}"#,
            )
            .create_async()
            .await;

        let text = provider(server.url(), "secret").generate("hello").await.unwrap();
        assert_eq!(text, "Judgment: No\nAlternatives: A");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = provider(server.url(), "secret").generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_out() {
        let err = provider("http://127.0.0.1:9".into(), "")
            .generate("hello")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn endpoint_accepts_prefixed_model_names() {
        let mut p = provider("http://localhost:3001/v1beta/".into(), "k");
        p.model = "models/gemini-1.5-flash".into();
        assert_eq!(
            p.endpoint(),
            "http://localhost:3001/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
