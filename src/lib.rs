pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod llm;
pub mod markdown;
pub mod models;
pub mod server;
pub mod session;
pub mod sse;

use cli::Args;
use config::prompt::{ load_prompts, PromptConfig };
use llm::{ chat::new_client, LlmConfig, LlmType };
use log::{ info, warn };
use server::{ api::AppState, Server };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.chat_llm_type.parse()?;

    info!("--- Core Configuration ---");
    info!("Bind Address: {}:{}", args.bind_host, args.port);
    info!("Chat LLM Type: {}", llm_type);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Temperature: {}", args.chat_temperature);
    info!("History Window: {}", args.history_window);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("(built-in)"));
    info!("Static Dir: {}", args.static_dir);
    info!("TLS Enabled: {}", args.enable_tls);
    if llm_type == LlmType::Gemini {
        if args.chat_api_key.trim().is_empty() {
            warn!("WARNING: Gemini API key not configured");
            warn!("Set GEMINI_API_KEY in the environment or .env file");
        } else {
            info!("Gemini API key is configured");
        }
    }
    info!("-------------------------");

    let llm_config = LlmConfig {
        llm_type,
        api_key: Some(args.chat_api_key.clone()),
        completion_model: Some(args.chat_model.clone()),
        base_url: args.chat_base_url.clone(),
        temperature: Some(args.chat_temperature),
    };
    let chat_client = new_client(&llm_config)?;

    let prompts = match &args.prompts_path {
        Some(path) => load_prompts(path)?,
        None => Arc::new(PromptConfig::default()),
    };

    let addr: SocketAddr = format!("{}:{}", args.bind_host, args.port)
        .parse()
        .map_err(|e| format!("Invalid bind address {}:{}: {}", args.bind_host, args.port, e))?;

    let state = AppState {
        chat_client,
        prompts,
        history_window: args.history_window,
    };

    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args);
    server.run().await?;

    Ok(())
}
