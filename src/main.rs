use anyhow::Result;
use clap::Parser;
use live_resume::{stream_file, Config};
use tracing::{error, info};

const CONFIG_PATH: &str = "config/live-resume";

/// Stream an audio file to a live transcription service, resuming across connection drops
#[derive(Parser)]
#[command(version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    Cli::parse();

    // wss:// uses rustls; pick the ring provider before any TLS handshake
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cfg = Config::load(CONFIG_PATH)?;
    let api_key = cfg.api_key()?;

    info!("Live Resume v{}", env!("CARGO_PKG_VERSION"));
    info!("Input file: {}", cfg.input.file_path.display());

    match stream_file(&cfg, &api_key).await {
        Ok(stats) => {
            info!(
                "Session complete: {} bytes sent, {} acknowledged, {} reconnects ({} forced), {} bytes replayed",
                stats.bytes_submitted,
                stats.bytes_acknowledged,
                stats.reconnects,
                stats.forced_reconnects,
                stats.bytes_replayed
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
