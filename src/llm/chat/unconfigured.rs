use async_trait::async_trait;

use super::{ BoxError, ChatClient, CompletionResponse };

/// Stands in for a provider whose credentials are missing. The server still
/// starts and serves static files and health checks; every generation
/// request fails with `reason`.
pub struct UnconfiguredChatClient {
    model: String,
    reason: String,
}

impl UnconfiguredChatClient {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { model: model.into(), reason: reason.into() }
    }
}

#[async_trait]
impl ChatClient for UnconfiguredChatClient {
    async fn complete(&self, _prompt: &str) -> Result<CompletionResponse, BoxError> {
        Err(self.reason.clone().into())
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_request_fails_with_reason() {
        let client = UnconfiguredChatClient::new("gemini-2.5-flash", "Gemini API key not configured");
        let err = client.complete("hi").await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini API key not configured");
        assert!(client.complete_stream("hi").await.is_err());
    }
}
