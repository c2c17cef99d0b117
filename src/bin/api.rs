use spendpal::{
    api::{start_server, ApiState},
    assistant::Assistant,
    ledger::Ledger,
    models::UserProfile,
    oracle::{GeminiOracle, Oracle},
    sessions::SessionStore,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 See .env.example for setup instructions");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 SpendPal Assistant - API Server");
    info!("📍 Port: {}", api_port);

    let oracle: Arc<dyn Oracle> = Arc::new(GeminiOracle::new(gemini_api_key)?);

    let assistant = Assistant::new(
        Arc::clone(&oracle),
        Arc::new(RwLock::new(Ledger::new())),
        Arc::new(RwLock::new(SessionStore::new())),
    );

    let state = ApiState {
        assistant: Arc::new(RwLock::new(assistant)),
        oracle,
        profile: Arc::new(RwLock::new(UserProfile::default())),
    };

    info!("✅ Assistant initialized");
    info!("📡 Starting API server...");

    start_server(state, api_port).await?;

    Ok(())
}
