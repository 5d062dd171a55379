use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use sqlx::postgres::PgPoolOptions;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

use mosaic::config::KioskConfig;
use mosaic::hub::HubEvent;
use mosaic::kiosk::camera::NoCamera;
use mosaic::kiosk::ids::IdGenerator;
use mosaic::kiosk::notifier::{LogNotifier, Notifier, WsNotifier};
use mosaic::kiosk::storage::SupabaseStorage;
use mosaic::kiosk::store::PgSubmissionStore;
use mosaic::kiosk::{Kiosk, KioskServices};

#[derive(Parser)]
#[command(name = "mosaic-kiosk", about = "Headless selfie kiosk and mosaic wall listener")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an image file as a selfie submission
    Submit {
        /// Image to submit
        file: PathBuf,
    },
    /// Print every imagesent event broadcast by the hub
    Listen {
        /// Hub WebSocket URL, e.g. ws://localhost:3000/ws
        #[arg(long)]
        hub: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_level = std::env::var("MOSAIC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    match cli.command {
        Command::Submit { file } => submit(file).await,
        Command::Listen { hub } => listen(&hub).await,
    }
}

async fn submit(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = KioskConfig::from_env().expect("Failed to load kiosk configuration");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let notifier: Arc<dyn Notifier> = match &config.hub_url {
        Some(url) => Arc::new(WsNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    };

    let ids = IdGenerator::detect();
    tracing::info!("Using {} id generator", if ids.is_secure() { "secure" } else { "fallback" });

    let kiosk = Kiosk::new(
        KioskServices {
            camera: Arc::new(NoCamera),
            storage: Arc::new(SupabaseStorage::new(&config.storage)?),
            store: Arc::new(PgSubmissionStore::new(pool)),
            notifier,
            ids: Arc::new(ids),
        },
        config.reset_delay,
    );

    if !kiosk.start_camera().await {
        tracing::info!("No live camera, using file {}", file.display());
    }
    kiosk.load_file(&file).await?;

    match kiosk.submit().await {
        Ok(outcome) => {
            println!("You look great! {}", outcome.message);
            println!("user id: {}", outcome.user_id);
            Ok(())
        }
        Err(e) => {
            let alert = kiosk.snapshot().alert.unwrap_or_default();
            eprintln!("{alert}");
            Err(e.into())
        }
    }
}

async fn listen(hub: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (ws, _) = tokio_tungstenite::connect_async(hub).await?;
    tracing::info!("Listening for images on {hub}");

    let (_sink, mut stream) = ws.split();
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<HubEvent>(text.as_str()) {
                Ok(event) if event.is_image_sent() => {
                    println!("{}", event.user_id().unwrap_or("<no userId>"));
                }
                Ok(event) => tracing::debug!("Ignoring '{}' event", event.event),
                Err(e) => tracing::warn!("Unparseable frame: {e}"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
