use crate::cli::Args;
use crate::config::prompt::{ build_chat_prompt, build_guide_prompt, PromptConfig };
use crate::history::window_slice;
use crate::llm::chat::{ create_streaming_response, ChatClient };
use crate::models::chat::{ ChatRequest, ErrorResponse, GuideRequest, GuideResponse, HealthResponse };
use crate::models::event::StreamEvent;
use std::any::Any;
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use axum::{
    extract::{ rejection::JsonRejection, State },
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{ sse::{ Event, Sse }, IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{ Any as CorsAny, CorsLayer };
use tower_http::services::ServeDir;
use log::{ debug, error, info, warn };

/// Client-facing text for any generation failure. Details stay in the log.
pub const GENERATION_FAILED: &str = "The career guidance service could not produce a response.";

#[derive(Clone)]
pub struct AppState {
    pub chat_client: Arc<dyn ChatClient>,
    pub prompts: Arc<PromptConfig>,
    pub history_window: usize,
}

pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new().allow_origin(CorsAny).allow_methods(CorsAny).allow_headers(CorsAny);

    let static_files = ServeDir::new(static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found_handler.into_service());

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/generate-guide", post(generate_guide_handler))
        .route("/api/health", get(health_handler))
        .fallback_service(static_files)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    app: Router,
    args: &Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                return Err("ENABLE_TLS is set but TLS_CERT_PATH or TLS_KEY_PATH is missing".into());
            }
        };

        let tls_config = axum_server::tls_rustls::RustlsConfig
            ::from_pem_file(cert_path, key_path).await
            .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

        info!("Career guidance server listening on https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;

        info!("Career guidance server listening on http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

fn bad_request(error: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response()
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!("Rejected chat request body: {}", rejection.body_text());
            return bad_request("Message is required");
        }
    };
    if req.message.trim().is_empty() {
        return bad_request("Message is required");
    }

    debug!(
        "Chat request with {} history entries ({} used)",
        req.history.len(),
        window_slice(&req.history, state.history_window).len()
    );
    let prompt = build_chat_prompt(&state.prompts, &req.history, state.history_window, &req.message);
    let client = Arc::clone(&state.chat_client);

    let events = create_streaming_response(move |tx| async move {
        relay_completion(client, prompt, tx).await;
    });

    Sse::new(events.map(|event| Event::default().json_data(event))).into_response()
}

/// Forwards provider chunks as `chunk` events, then exactly one `complete`
/// or `error` event.
async fn relay_completion(client: Arc<dyn ChatClient>, prompt: String, tx: mpsc::Sender<StreamEvent>) {
    let mut chunks = match client.complete_stream(&prompt).await {
        Ok(chunks) => chunks,
        Err(e) => {
            error!("Chat generation failed before streaming ({}): {}", client.get_model(), e);
            let _ = tx.send(StreamEvent::error(GENERATION_FAILED)).await;
            return;
        }
    };

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                if tx.send(StreamEvent::chunk(text)).await.is_err() {
                    warn!("Chat client disconnected mid-stream");
                    return;
                }
            }
            Err(e) => {
                error!("Chat generation failed mid-stream ({}): {}", client.get_model(), e);
                let _ = tx.send(StreamEvent::error(GENERATION_FAILED)).await;
                return;
            }
        }
    }

    let _ = tx.send(StreamEvent::complete()).await;
}

async fn generate_guide_handler(
    State(state): State<AppState>,
    payload: Result<Json<GuideRequest>, JsonRejection>
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!("Rejected guide request body: {}", rejection.body_text());
            return bad_request("Career field is required");
        }
    };
    let career = req.career.trim();
    if career.is_empty() {
        return bad_request("Career field is required");
    }

    let prompt = build_guide_prompt(&state.prompts, career);
    match state.chat_client.complete(&prompt).await {
        Ok(resp) => Json(GuideResponse { guide: resp.response }).into_response(),
        Err(e) => {
            error!("Career guide generation error for '{}': {}", career, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_message("Failed to generate career guide", GENERATION_FAILED)),
            ).into_response()
        }
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Career Guidance Chatbot API is running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Endpoint not found")))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!("Unhandled error in request handler: {}", details);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::with_message("Internal server error", "Something went wrong")),
    ).into_response()
}
