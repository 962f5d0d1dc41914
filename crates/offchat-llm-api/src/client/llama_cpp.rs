use async_trait::async_trait;
use futures::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use offchat_logging::{log_request, log_request_to_file, log_response, log_stream_chunk};
use offchat_types::STOP_SEQUENCES;

use crate::client::{GenerationParams, InferenceClient, TextStream};
use crate::error::InferenceError;
use crate::DEFAULT_PORT;

/// llama.cpp server client using the native `/completion` endpoint
pub struct LlamaCppClient {
    base_url: String,
    client: reqwest::Client,
    verbose: bool,
    request_log_dir: Option<PathBuf>,
}

/// Body of a `/completion` request
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    stop: Vec<&'static str>,
    stream: bool,
}

/// `/completion` response, also the shape of each streamed event
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

/// One parsed server-sent event line
#[derive(Debug, PartialEq)]
enum SseEvent {
    /// Generated text; `last` is set on the event that ends generation
    Content { text: String, last: bool },
    Done,
}

/// Parse a single SSE line; non-data lines yield `None`
fn parse_sse_line(line: &str) -> Result<Option<SseEvent>, InferenceError> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();

    // Check for stream end marker
    if data.trim() == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: CompletionResponse = serde_json::from_str(data)?;
    if chunk.stop && chunk.content.is_empty() {
        Ok(Some(SseEvent::Done))
    } else {
        Ok(Some(SseEvent::Content {
            text: chunk.content,
            last: chunk.stop,
        }))
    }
}

/// Turn a streaming `/completion` response into text fragments
fn sse_text_stream(
    response: reqwest::Response,
    verbose: bool,
) -> impl Stream<Item = Result<String, InferenceError>> + Send {
    async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        // Raw bytes: a chunk may end inside a multi-byte character
        let mut buffer: Vec<u8> = Vec::new();
        let mut chunk_counter = 0;

        'outer: while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            // Process complete lines (SSE format: "data: {json}\n\n")
            while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end();

                if line.is_empty() {
                    continue;
                }

                chunk_counter += 1;
                log_stream_chunk(chunk_counter, line, verbose);

                match parse_sse_line(line)? {
                    Some(SseEvent::Content { text, last }) => {
                        if !text.is_empty() {
                            yield text;
                        }
                        if last {
                            break 'outer;
                        }
                    }
                    Some(SseEvent::Done) => break 'outer,
                    None => {}
                }
            }
        }
    }
}

impl LlamaCppClient {
    /// Create a new client for a server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        // Ensure base_url doesn't end with a slash
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
            verbose: false,
            request_log_dir: None,
        }
    }

    /// Create a new client with a custom port on localhost.
    pub fn with_port(port: u16) -> Self {
        Self::new(format!("http://127.0.0.1:{}", port))
    }

    /// Print requests/responses and write request copies into `log_dir`.
    pub fn with_request_logging(mut self, verbose: bool, log_dir: Option<PathBuf>) -> Self {
        self.verbose = verbose;
        self.request_log_dir = log_dir;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.base_url)
    }

    fn build_request<'a>(&self, prompt: &'a str, params: &GenerationParams, stream: bool) -> CompletionRequest<'a> {
        CompletionRequest {
            prompt,
            n_predict: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stop: STOP_SEQUENCES.to_vec(),
            stream,
        }
    }

    async fn send(&self, request: &CompletionRequest<'_>) -> Result<reqwest::Response, InferenceError> {
        let url = self.completion_url();

        log_request(&url, request, self.verbose);
        if self.verbose {
            if let Some(dir) = &self.request_log_dir {
                if let Err(e) = log_request_to_file(dir, &url, request) {
                    eprintln!("[Logging error] {}", e);
                }
            }
        }

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InferenceError::ServerNotRunning(self.base_url.clone())
                } else {
                    InferenceError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log_response(&status, &text, self.verbose);
            return Err(InferenceError::Api(format!("{}: {}", status, text)));
        }

        Ok(response)
    }
}

impl Default for LlamaCppClient {
    fn default() -> Self {
        Self::with_port(DEFAULT_PORT)
    }
}

#[async_trait]
impl InferenceClient for LlamaCppClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, InferenceError> {
        let request = self.build_request(prompt, params, false);
        let response = self.send(&request).await?;
        let status = response.status();

        let response_text = response.text().await?;
        log_response(&status, &response_text, self.verbose);

        let completion: CompletionResponse = serde_json::from_str(&response_text)?;
        Ok(completion.content.trim().to_string())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<TextStream, InferenceError> {
        let request = self.build_request(prompt, params, true);
        let response = self.send(&request).await?;
        Ok(Box::pin(sse_text_stream(response, self.verbose)))
    }

    async fn check_health(&self) -> Result<(), InferenceError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    InferenceError::ServerNotRunning(self.base_url.clone())
                } else {
                    InferenceError::Http(e)
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(InferenceError::ServerNotRunning(self.base_url.clone()))
        }
    }
}
