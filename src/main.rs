use anyhow::Result;
use clap::Parser;
use osbuddy::cli::{Cli, Commands};
use osbuddy::core::persona::{is_farewell, FAREWELL};
use osbuddy::storage::{HistoryStore, JsonFileStore};
use osbuddy::{utils, ChatRelay, CompletionClient, LLMClient, Settings, WebServer};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::new()?;
    init_tracing(&settings.logging.level);

    let cli = Cli::parse();

    let api_key = Settings::api_key().unwrap_or_else(|| {
        tracing::warn!("⚠️ OPENROUTER_API_KEY not set! Completion requests will be rejected upstream");
        String::new()
    });
    let client: Arc<dyn CompletionClient> =
        Arc::new(LLMClient::new(api_key, settings.llm.clone()));

    match cli.command {
        Commands::Serve {
            mode,
            port,
            store,
            index,
        } => {
            if let Some(mode) = mode {
                settings.server.mode = mode;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(store) = store {
                settings.store.path = store;
            }
            if let Some(index) = index {
                settings.server.index_path = index;
            }
            handle_serve(settings, client).await
        }
        Commands::Interactive { user_id, store } => {
            if let Some(store) = store {
                settings.store.path = store;
            }
            handle_interactive(settings, client, user_id).await
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn handle_serve(settings: Settings, client: Arc<dyn CompletionClient>) -> Result<()> {
    if settings.server.mode == osbuddy::RelayMode::Session && settings.uses_default_secret() {
        tracing::warn!("SESSION_SECRET_KEY not set, signing session cookies with the development key");
    }

    let server = WebServer::from_settings(&settings, client).await?;
    server.start().await
}

async fn handle_interactive(
    settings: Settings,
    client: Arc<dyn CompletionClient>,
    user_id: Option<String>,
) -> Result<()> {
    let store = Arc::new(JsonFileStore::open(&settings.store.path).await?);
    let relay = ChatRelay::new(client, store.clone());

    let resuming = user_id.is_some();
    let user_id = user_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    utils::print_header("OpenSourceBuddy");
    utils::print_info(&format!("User ID: {}", user_id));
    utils::print_info(&format!("History: {:?}", store.path()));
    if store.exists(&user_id).await? {
        let count = store.resolve(&user_id).await?.len();
        utils::print_success(&format!("Resumed conversation with {} messages", count));
    } else if resuming {
        utils::print_warning(&format!(
            "No stored conversation for '{}', starting a new one",
            user_id
        ));
    }
    utils::print_info("Type exit, quit or bye to leave; /history and /count inspect the conversation\n");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if is_farewell(input) {
            utils::print_success(FAREWELL);
            break;
        }

        if input == "/history" {
            for message in store.resolve(&user_id).await?.messages() {
                utils::print_message(message);
            }
            println!();
            continue;
        }

        if input == "/count" {
            let count = store.resolve(&user_id).await?.len();
            utils::print_info(&format!("Messages in conversation: {}", count));
            println!();
            continue;
        }

        match relay.turn(&user_id, input).await {
            Ok(reply) => {
                utils::print_info("Buddy: ");
                println!("{}\n", reply);
            }
            Err(e) => utils::print_error(&format!("Error: {:#}", e)),
        }
    }

    Ok(())
}
