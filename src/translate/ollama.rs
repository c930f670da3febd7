use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::EndpointConfig;
use crate::error::{Result, SubtranslateError};
use super::{TranslationRequest, Translator};
use super::prompt::PromptBuilder;
use super::sanitize::Sanitizer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    name: String,
}

/// HTTP client for an ollama server
pub struct OllamaClient {
    probe_client: Client,
    generate_client: Client,
    config: EndpointConfig,
    prompts: PromptBuilder,
    sanitizer: Sanitizer,
}

impl OllamaClient {
    pub fn new(config: EndpointConfig, prompts: PromptBuilder, sanitizer: Sanitizer) -> Result<Self> {
        let probe_client = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()?;
        let generate_client = Client::builder()
            .timeout(Duration::from_secs(config.generate_timeout_secs))
            .build()?;

        Ok(Self {
            probe_client,
            generate_client,
            config,
            prompts,
            sanitizer,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Names of the models the server has available
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.url(&self.config.models_path);
        debug!("Checking available models at {}", url);

        let response = self.probe_client.get(&url).send().await?.error_for_status()?;
        let list: ModelList = response.json().await?;

        Ok(list
            .models
            .into_iter()
            .map(|model| model.name)
            .filter(|name| !name.is_empty())
            .collect())
    }

    /// Whether `model` is served by the endpoint. Failures count as "no".
    pub async fn check_availability(&self, model: &str) -> bool {
        match self.list_models().await {
            Ok(models) => {
                if models.iter().any(|name| name == model) {
                    info!("Model '{}' is available", model);
                    true
                } else {
                    warn!("Model '{}' not found. Available models: {}", model, models.join(", "));
                    false
                }
            }
            Err(e) => {
                warn!("Cannot reach inference endpoint at {}: {}", self.config.url, e);
                false
            }
        }
    }

    /// Single generation call, returning the raw model output
    pub async fn generate(&self, model: &str, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            model: model.to_string(),
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.num_predict,
            },
        };

        let url = self.url(&self.config.generate_path);
        let response = self.generate_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubtranslateError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubtranslateError::Translation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| SubtranslateError::Translation(format!("Failed to parse response: {}", e)))?;

        Ok(generated.response)
    }

    /// Translate and clean one entry's text
    pub async fn try_translate(
        &self,
        text: &str,
        target_language: &str,
        model: &str,
        context: Option<&str>,
    ) -> Result<String> {
        let prompt = self.prompts.build(text, target_language, context);

        debug!("Sending translation request (text length: {} chars)", text.len());
        let started = Instant::now();
        let raw = self.generate(model, prompt).await?;
        debug!("Translation received in {:.2}s", started.elapsed().as_secs_f64());
        debug!("Raw model output: {}", raw);

        let cleaned = self.sanitizer.sanitize(&raw, target_language);
        if cleaned.is_empty() {
            return Err(SubtranslateError::Translation("Empty translation received".to_string()));
        }
        Ok(cleaned)
    }

    /// Translate one entry. Any failure yields the original text.
    pub async fn translate_one(
        &self,
        text: &str,
        target_language: &str,
        model: &str,
        context: Option<&str>,
    ) -> String {
        match self.try_translate(text, target_language, model, context).await {
            Ok(translation) => translation,
            Err(e) => {
                warn!("Keeping original text: {}", e);
                text.to_string()
            }
        }
    }
}

#[async_trait]
impl Translator for OllamaClient {
    async fn check_availability(&self, model: &str) -> bool {
        OllamaClient::check_availability(self, model).await
    }

    async fn translate_one(&self, text: &str, request: &TranslationRequest) -> String {
        OllamaClient::translate_one(
            self,
            text,
            &request.target_language,
            &request.model,
            request.context.as_deref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `body` as a JSON 200 response to each connection and hands the
    /// received request bodies back through the join handle.
    async fn stub_server(bodies: Vec<&'static str>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return String::from_utf8_lossy(&buf[header_end + 4..]).into_owned();
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client(url: &str) -> OllamaClient {
        let config = EndpointConfig {
            url: url.to_string(),
            probe_timeout_secs: 2,
            generate_timeout_secs: 2,
            ..EndpointConfig::default()
        };
        OllamaClient::new(config, PromptBuilder::default(), Sanitizer::default()).unwrap()
    }

    /// Nothing listens on the discard port in the test environment
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn test_fallback_on_connection_failure() {
        let client = client(UNREACHABLE);
        let text = "Hello\nthere";

        assert_eq!(client.translate_one(text, "es", "qwen2.5:14b", None).await, text);
    }

    #[tokio::test]
    async fn test_fallback_on_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        // Accept the request and never answer
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = EndpointConfig {
            url,
            generate_timeout_secs: 1,
            ..EndpointConfig::default()
        };
        let client = OllamaClient::new(config, PromptBuilder::default(), Sanitizer::default()).unwrap();

        let started = Instant::now();
        assert_eq!(client.translate_one("Hello", "es", "qwen2.5:14b", None).await, "Hello");
        assert!(started.elapsed() < Duration::from_secs(10));
        server.abort();
    }

    #[tokio::test]
    async fn test_availability_false_when_unreachable() {
        assert!(!client(UNREACHABLE).check_availability("qwen2.5:14b").await);
    }

    #[tokio::test]
    async fn test_availability_from_registry() {
        let registry = r#"{"models":[{"name":"gemma2:27b"},{"name":"qwen2.5:14b"}]}"#;
        let (url, server) = stub_server(vec![registry, registry]).await;
        let client = client(&url);

        assert!(client.check_availability("qwen2.5:14b").await);
        assert!(!client.check_availability("llama3.2:3b").await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_translate_one_sends_options_and_sanitizes() {
        let (url, server) = stub_server(vec![r#"{"response":"Translation: Hola\nNote: informal","done":true}"#]).await;
        let client = client(&url);

        let translated = client.translate_one("Hello", "es", "qwen2.5:14b", Some("A western")).await;
        assert_eq!(translated, "Hola");

        let requests = server.await.unwrap();
        let sent: serde_json::Value = serde_json::from_str(&requests[0]).unwrap();
        assert_eq!(sent["model"], "qwen2.5:14b");
        assert_eq!(sent["stream"], false);
        assert_eq!(sent["options"]["num_predict"], 500);
        assert!(sent["prompt"].as_str().unwrap().contains("A western"));
    }

    #[tokio::test]
    async fn test_fallback_on_malformed_or_empty_response() {
        let (url, server) = stub_server(vec![r#"{"unexpected":true}"#, r#"{"response":"Note: nothing to translate"}"#]).await;
        let client = client(&url);

        assert_eq!(client.translate_one("Hello", "es", "m", None).await, "Hello");
        assert_eq!(client.translate_one("World", "es", "m", None).await, "World");
        server.await.unwrap();
    }
}
