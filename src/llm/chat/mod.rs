pub mod gemini;
pub mod mock;
pub mod unconfigured;

use async_trait::async_trait;
use futures::{ Future, Stream, StreamExt };
use serde::Deserialize;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::gemini::GeminiChatClient;
use self::mock::MockChatClient;
use self::unconfigured::UnconfiguredChatClient;
use crate::sse::LineBuffer;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use log::{ debug, warn };

pub type BoxError = Box<dyn StdError + Send + Sync>;
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, BoxError>> + Send>>;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, BoxError>;

    /// Incremental text chunks in arrival order. Providers without native
    /// streaming deliver the whole completion as one chunk.
    async fn complete_stream(&self, prompt: &str) -> Result<ChunkStream, BoxError> {
        let resp = self.complete(prompt).await?;
        let text = resp.response;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    fn get_model(&self) -> String;
}

/// Runs `response_fn` on its own task and exposes everything it sends as a
/// stream. The stream ends when the task drops its sender.
pub fn create_streaming_response<T, F, Fut>(
    response_fn: F
) -> Pin<Box<dyn Stream<Item = T> + Send>>
where
    T: Send + 'static,
    F: FnOnce(mpsc::Sender<T>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

/// A Gemini config without a key yields a client that fails every request,
/// so the server can still start.
pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, BoxError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gemini if !has_api_key(config) => {
            warn!("Gemini API key missing; chat and guide requests will fail until it is set");
            let model = config.completion_model.clone().unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            Arc::new(UnconfiguredChatClient::new(model, "Gemini API key not configured"))
        }
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Mock => Arc::new(MockChatClient::new()),
    };
    Ok(client)
}

fn has_api_key(config: &LlmConfig) -> bool {
    config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

/// POSTs `payload` to `url` and streams every line `line_parser` accepts.
/// Connection failures and non-success statuses are returned before any
/// chunk is produced.
pub async fn http_stream_generate(
    url: String,
    payload: impl serde::Serialize + Send + 'static,
    line_parser: fn(&str) -> Option<String>,
    headers: Option<Vec<(String, String)>>,
) -> Result<ChunkStream, BoxError> {
    let client = reqwest::Client::new();
    let mut req = client.post(&url).json(&payload);

    if let Some(header_list) = headers {
        for (name, value) in header_list {
            req = req.header(name, value);
        }
    }

    // Error text never carries the request URL.
    let resp = req
        .send().await
        .and_then(|r| r.error_for_status())
        .map_err(|e| Box::new(e.without_url()) as BoxError)?;

    Ok(create_streaming_response(move |tx| async move {
        let mut bytes = resp.bytes_stream();
        let mut lines = LineBuffer::new();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(buf) => {
                    for line in lines.push(&buf) {
                        if let Some(tok) = line_parser(&line) {
                            if tx.send(Ok(tok)).await.is_err() {
                                debug!("Stream consumer went away, stopping upstream read");
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(Box::new(e.without_url()) as BoxError)).await;
                    return;
                }
            }
        }
        if let Some(tok) = lines.finish().as_deref().and_then(line_parser) {
            let _ = tx.send(Ok(tok)).await;
        }
    }))
}
