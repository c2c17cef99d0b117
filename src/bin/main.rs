use spendpal::{
    assistant::Assistant,
    ledger::Ledger,
    models::ChatRole,
    oracle::{GeminiOracle, MockOracle, Oracle},
    sessions::SessionStore,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let oracle: Arc<dyn Oracle> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => Arc::new(GeminiOracle::new(key)?),
        _ => {
            eprintln!("⚠️  GEMINI_API_KEY not set; running with the mock oracle");
            eprintln!("📌 See .env.example for setup instructions");
            Arc::new(MockOracle::new())
        }
    };

    let mut assistant = Assistant::new(
        oracle,
        Arc::new(RwLock::new(Ledger::new())),
        Arc::new(RwLock::new(SessionStore::new())),
    );

    info!("SpendPal assistant ready");
    println!("SpendPal assistant. Type a message, or 'quit' to exit.");
    println!("Try: add 4.50 coffee at starbucks / budget 500 for food / new goal laptop 2000");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let before = assistant.visible_history().await.len();
        assistant.submit(line).await?;

        for msg in &assistant.visible_history().await[before..] {
            if msg.role == ChatRole::Model {
                println!("🤖 {}", msg.text);
            }
        }
    }

    Ok(())
}
