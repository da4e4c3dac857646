use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, info };

use crate::llm::chat::create_streaming_response;
use crate::models::chat::{ ChatMessage, ChatRequest, GuideRequest, GuideResponse };
use crate::models::event::StreamEvent;
use crate::session::{ ChatBackend, ChatError, EventStream };
use crate::sse::{ data_payload, LineBuffer };

/// Talks to a running career-guide server over `/api/chat` and
/// `/api/generate-guide`.
#[derive(Clone)]
pub struct HttpChatBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("HTTP chat backend targeting {}", base_url);
        Self { base_url, http: reqwest::Client::new() }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport(e: reqwest::Error) -> ChatError {
    ChatError::Transport(e.to_string())
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ChatError::Transport(format!("HTTP error! status: {}", status)))
    }
}

/// Decodes one event-stream line. Lines that carry no `data:` field yield `None`.
fn parse_event_line(line: &str) -> Option<Result<StreamEvent, ChatError>> {
    let payload = data_payload(line)?.trim();
    if payload.is_empty() {
        return None;
    }
    Some(
        serde_json
            ::from_str::<StreamEvent>(payload)
            .map_err(|e| ChatError::Transport(format!("malformed event frame: {}", e)))
    )
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat_stream(
        &self,
        message: &str,
        history: &[ChatMessage]
    ) -> Result<EventStream, ChatError> {
        let body = ChatRequest {
            message: message.to_string(),
            history: history.to_vec(),
        };
        let resp = self.http.post(self.endpoint("/api/chat")).json(&body).send().await.map_err(transport)?;
        let resp = check_status(resp)?;

        Ok(create_streaming_response(move |tx| async move {
            let mut bytes = resp.bytes_stream();
            let mut lines = LineBuffer::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(buf) => {
                        for line in lines.push(&buf) {
                            if let Some(event) = parse_event_line(&line) {
                                if tx.send(event).await.is_err() {
                                    debug!("Reply consumer dropped, closing chat stream");
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(transport(e))).await;
                        return;
                    }
                }
            }
            if let Some(event) = lines.finish().as_deref().and_then(parse_event_line) {
                let _ = tx.send(event).await;
            }
        }))
    }

    async fn generate_guide(&self, career: &str) -> Result<String, ChatError> {
        let body = GuideRequest { career: career.to_string() };
        let resp = self.http
            .post(self.endpoint("/api/generate-guide"))
            .json(&body)
            .send().await
            .map_err(transport)?;
        let guide: GuideResponse = check_status(resp)?.json().await.map_err(transport)?;
        Ok(guide.guide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_event_frames() {
        let event = parse_event_line(r#"data: {"type":"chunk","content":"Hi"}"#).unwrap().unwrap();
        assert_eq!(event, StreamEvent::chunk("Hi"));
        let event = parse_event_line(r#"data: {"type":"error","content":"down"}"#).unwrap().unwrap();
        assert_eq!(event, StreamEvent::error("down"));
    }

    #[test]
    fn skips_non_data_lines() {
        assert!(parse_event_line("").is_none());
        assert!(parse_event_line(": ping").is_none());
        assert!(parse_event_line("data: ").is_none());
    }

    #[test]
    fn malformed_frame_is_a_transport_error() {
        let err = parse_event_line("data: {oops").unwrap().unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let backend = HttpChatBackend::new("http://localhost:3000/");
        assert_eq!(backend.endpoint("/api/chat"), "http://localhost:3000/api/chat");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let backend = HttpChatBackend::new("http://127.0.0.1:9");
        let result = backend.generate_guide("Pilot").await;
        assert!(matches!(result, Err(ChatError::Transport(_))));
    }
}
