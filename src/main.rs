use std::sync::Arc;

use landmark_lens::config::Configuration;
use landmark_lens::error::AppError;
use landmark_lens::{trigger, CloudVisionDetector, Orchestrator, StillImageCamera, TerminalPanel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

fn init_logging(log_level: &str) {
    let level = log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let configuration = Configuration::load()?;
    init_logging(&configuration.log_level);

    let detector = CloudVisionDetector::new(&configuration.vision)?;
    let camera = StillImageCamera::new(
        configuration.camera.image_path.clone(),
        configuration.camera.rotation,
    );
    let panel = TerminalPanel::new(std::io::stdout())
        .with_preview_path(configuration.presentation.preview_path.clone());

    let orchestrator = Orchestrator::builder()
        .trigger_buffer_size(configuration.channels.trigger_buffer_size)
        .completion_buffer_size(configuration.channels.completion_buffer_size)
        .trigger(trigger::from_configuration(&configuration.trigger))
        .camera(Box::new(camera))
        .detector(Arc::new(detector))
        .sink(Box::new(panel))
        .build()?;

    if !orchestrator.has_trigger() {
        warn!("No trigger available, captures cannot be started");
    }

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
        shutdown_token.cancel();
    });

    orchestrator.run(cancel_token).await
}
