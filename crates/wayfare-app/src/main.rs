//! Wayfare application binary - composition root.
//!
//! Ties together the Wayfare crates into a single executable:
//! 1. Load `.env` and the required API credentials
//! 2. Load configuration from TOML
//! 3. Build the completion and maps HTTP clients
//! 4. Run the console read-eval loop over the conversation controller

use std::io::{BufRead, Write};

use clap::Parser;

use wayfare_chat::Controller;
use wayfare_core::{Credentials, WayfareConfig};
use wayfare_llm::HttpCompletionClient;
use wayfare_maps::GoogleMapsClient;

mod cli;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `.env` is optional; real environment variables win either way.
    dotenv::dotenv().ok();

    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = WayfareConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Wayfare v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Credentials are required; refuse to start without them.
    let credentials = Credentials::from_env()?;

    // Clients.
    let llm = HttpCompletionClient::new(&config.llm, &credentials.llm_api_key)?;
    let maps = GoogleMapsClient::new(&config.maps, &credentials.maps_api_key)?;
    let mut controller = Controller::new(llm, maps, &config.chat);

    // Console loop.
    println!("Welcome to the Wayfare travel assistant!");
    println!("Ask me about travel durations between locations.");
    println!("Type 'exit' to end the conversation.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            // End of input is treated like an exit request.
            None => {
                println!();
                break;
            }
        };

        let reply = controller.handle_line(&line).await;
        for message in &reply.messages {
            println!("Chatbot: {message}");
        }
        if reply.session_over {
            break;
        }
    }

    tracing::info!("Session ended");
    Ok(())
}
