use serde::{ Serialize, Deserialize };

/// Frame carried in each `data:` line of the `/api/chat` event stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk {
        content: String,
    },
    Complete {
        #[serde(default)]
        content: String,
    },
    Error {
        #[serde(default)]
        content: String,
    },
}

impl StreamEvent {
    pub fn chunk(content: impl Into<String>) -> Self {
        StreamEvent::Chunk { content: content.into() }
    }

    pub fn complete() -> Self {
        StreamEvent::Complete { content: String::new() }
    }

    pub fn error(content: impl Into<String>) -> Self {
        StreamEvent::Error { content: content.into() }
    }
}
