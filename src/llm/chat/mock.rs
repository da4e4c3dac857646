use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{ Mutex, PoisonError };
use futures::stream;

use super::{ BoxError, ChatClient, ChunkStream, CompletionResponse };

/// One scripted provider call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Stream these chunks, or join them for a buffered completion.
    Chunks(Vec<String>),
    /// Stream these chunks, then fail mid-stream.
    FailAfter(Vec<String>, String),
    /// Fail before producing anything.
    Refuse(String),
}

/// Offline provider. Scripted replies are consumed in order; once the script
/// runs out it echoes the final `user:` line of the prompt.
#[derive(Default)]
pub struct MockChatClient {
    script: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next_reply(&self, prompt: &str) -> MockReply {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt.to_string());
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| MockReply::Chunks(vec![echo(prompt)]))
    }
}

fn echo(prompt: &str) -> String {
    let last = prompt
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix("user: "))
        .or_else(|| prompt.lines().rev().find(|line| !line.trim().is_empty()))
        .unwrap_or("[no input]");
    format!("MOCK: {}", last.trim())
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, BoxError> {
        match self.next_reply(prompt) {
            MockReply::Chunks(chunks) => Ok(CompletionResponse { response: chunks.concat() }),
            MockReply::FailAfter(_, message) | MockReply::Refuse(message) => Err(message.into()),
        }
    }

    async fn complete_stream(&self, prompt: &str) -> Result<ChunkStream, BoxError> {
        let items: Vec<Result<String, BoxError>> = match self.next_reply(prompt) {
            MockReply::Chunks(chunks) => chunks.into_iter().map(Ok).collect(),
            MockReply::FailAfter(chunks, message) => {
                let mut items: Vec<Result<String, BoxError>> = chunks.into_iter().map(Ok).collect();
                items.push(Err(message.into()));
                items
            }
            MockReply::Refuse(message) => {
                return Err(message.into());
            }
        };
        Ok(Box::pin(stream::iter(items)))
    }

    fn get_model(&self) -> String {
        "mock-model".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn echoes_last_user_line() {
        let client = MockChatClient::new();
        let resp = client.complete("PREAMBLE\n\nuser: old\nassistant: x\nuser: new one\nassistant: ").await.unwrap();
        assert_eq!(resp.response, "MOCK: new one");
    }

    #[tokio::test]
    async fn scripted_failure_arrives_after_chunks() {
        let client = MockChatClient::scripted(vec![
            MockReply::FailAfter(vec!["a".into(), "b".into()], "boom".into()),
        ]);
        let items: Vec<Result<String, BoxError>> = client.complete_stream("p").await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert_eq!(items[2].as_ref().unwrap_err().to_string(), "boom");
        assert_eq!(client.prompts(), vec!["p".to_string()]);
    }

    #[tokio::test]
    async fn refusal_fails_before_streaming() {
        let client = MockChatClient::scripted(vec![MockReply::Refuse("down".into())]);
        assert!(client.complete_stream("p").await.is_err());
    }
}
