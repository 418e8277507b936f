//! apichat — local web front end streaming replies from a chat completions API.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("APICHAT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn print_help() {
    println!("apichat — local chat front end for OpenAI-compatible APIs");
    println!();
    println!("Usage: apichat [command]");
    println!();
    println!("Commands:");
    println!("  (none)          Start the server");
    println!("  show-config     Print the stored endpoint and whether an API key is set");
    println!("  help            Show this help message");
    println!();
    println!("Environment:");
    println!("  HOST, PORT                       Listen address (default 127.0.0.1:5000)");
    println!("  APICHAT_DATA_DIR                 Directory holding config.json (default .)");
    println!("  APICHAT_MODEL                    Model id sent upstream");
    println!("  APICHAT_UPSTREAM_TIMEOUT_SECS    Upstream connect/read timeout (default 60)");
    println!("  APICHAT_MAX_BODY_BYTES           Request body limit");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = resolve_data_dir();

    if args.len() > 1 {
        match args[1].as_str() {
            "show-config" => {
                let paths = apichat_core::DataPaths::new(&data_dir);
                let view = apichat_chat::config::load_or_default(&paths.config_file).to_view();
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'apichat help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let settings = apichat_core::Settings::from_env(&data_dir)?;
    let addr = settings.bind_addr();

    info!("Config file: {}", settings.data_paths.config_file.display());
    info!("Model: {}", settings.model);

    let state = Arc::new(AppState::new(settings)?);
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("apichat listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
