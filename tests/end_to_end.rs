use career_guide::client::HttpChatBackend;
use career_guide::config::prompt::PromptConfig;
use career_guide::llm::chat::mock::{ MockChatClient, MockReply };
use career_guide::markdown::render;
use career_guide::models::chat::{ ChatMessage, Role };
use career_guide::server::api::{ router, AppState };
use career_guide::session::{ ChatSession, DisplayMessage, FALLBACK_MESSAGE };
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_server(client: Arc<MockChatClient>) -> SocketAddr {
    let static_dir = tempfile::tempdir().unwrap();
    let state = AppState {
        chat_client: client,
        prompts: Arc::new(PromptConfig {
            system_prompt: "PREAMBLE".to_string(),
            ..PromptConfig::default()
        }),
        history_window: 5,
    };
    let app = router(state, static_dir.path());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _static_dir = static_dir;
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn session_for(addr: SocketAddr) -> ChatSession {
    ChatSession::new(Arc::new(HttpChatBackend::new(format!("http://{}", addr))))
}

#[tokio::test]
async fn conversation_streams_through_the_server() {
    let mock = Arc::new(
        MockChatClient::scripted(vec![
            MockReply::Chunks(vec!["**Skills:**".into(), " Python".into(), "\n- SQL\n- Statistics".into()]),
        ])
    );
    let addr = spawn_server(mock.clone()).await;
    let mut session = session_for(addr);

    let mut chunks = Vec::new();
    let shown = session
        .send_with("What skills does a data analyst need?", |c| chunks.push(c.to_string())).await
        .unwrap();

    assert_eq!(chunks.len(), 3);
    assert_eq!(shown.role, Role::Assistant);
    assert_eq!(shown.html, "<strong>Skills:</strong> Python<br><ul><li>SQL</li><li>Statistics</li></ul>");

    let follow_up = session.send("And salaries?").await.unwrap();
    assert_eq!(follow_up.html, "MOCK: And salaries?");

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(
        prompts[1].ends_with(
            "user: What skills does a data analyst need?\n\
             assistant: **Skills:** Python\n- SQL\n- Statistics\n\
             user: And salaries?\nassistant: "
        )
    );
    assert_eq!(session.buffer().len(), 4);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn provider_failure_shows_fallback() {
    let mock = Arc::new(MockChatClient::scripted(vec![MockReply::FailAfter(vec!["Half".into()], "boom".into())]));
    let addr = spawn_server(mock).await;
    let mut session = session_for(addr);

    let shown = session.send("hello").await.unwrap();
    assert_eq!(shown.html, render(FALLBACK_MESSAGE));
    assert_eq!(session.buffer().messages(), vec![ChatMessage::user("hello")]);
}

#[tokio::test]
async fn guide_round_trip() {
    let mock = Arc::new(MockChatClient::scripted(vec![MockReply::Chunks(vec!["• Job: flies aircraft".into()])]));
    let addr = spawn_server(mock).await;
    let mut session = session_for(addr);

    let shown = session.generate_guide("Pilot").await.unwrap();
    assert_eq!(shown, DisplayMessage::assistant("• Job: flies aircraft"));
    assert_eq!(shown.html, "<ul><li>Job: flies aircraft</li></ul>");
}

#[tokio::test]
async fn unreachable_server_shows_fallback() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut session = session_for(addr);
    let shown = session.send("hello").await.unwrap();
    assert_eq!(shown, DisplayMessage::assistant(FALLBACK_MESSAGE));
    assert!(!session.is_busy());
}
