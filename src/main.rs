//! Vibe Sommelier
//!
//! Main entry point: desktop UI by default, or a one-shot headless tasting
//! with `--analyze <file>`.

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vibe_sommelier::analysis::{AnalysisService, GeminiAnalysisService, UnavailableAnalysis};
use vibe_sommelier::camera::{CameraProvider, StillImageCamera, UnavailableCamera};
use vibe_sommelier::testconfig::TestConfig;
use vibe_sommelier::ui::SommelierApp;
use vibe_sommelier::{SessionController, SommelierConfig};

#[derive(Parser, Debug)]
#[command(name = "vibe-sommelier", version, about = "Aesthetic tasting notes for a scene")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image file served as the camera feed
    #[arg(long, value_name = "FILE")]
    camera_source: Option<PathBuf>,

    /// Scripted scenario to run against the UI
    #[arg(long, value_name = "FILE")]
    test_config: Option<PathBuf>,

    /// Taste a single image, print the result as JSON and exit
    #[arg(long, value_name = "FILE", conflicts_with = "test_config")]
    analyze: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibe_sommelier=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = SommelierConfig::resolve(args.config.as_deref())?;
    if let Some(source) = args.camera_source {
        config.camera = config.camera.with_source(source);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    let camera: Arc<dyn CameraProvider> = match config.camera.source.clone() {
        Some(source) => {
            info!("[CAMERA] Using still source {}", source.display());
            Arc::new(StillImageCamera::new(source))
        }
        None => {
            warn!("[CAMERA] No camera source configured; Live View will be refused");
            Arc::new(UnavailableCamera)
        }
    };

    if let Some(path) = args.analyze {
        let analyzer: Arc<dyn AnalysisService> =
            Arc::new(GeminiAnalysisService::new(&config.analysis)?);
        let controller = SessionController::new(camera, analyzer, config);
        return runtime.block_on(analyze_file(&controller, &path));
    }

    let analyzer: Arc<dyn AnalysisService> = match GeminiAnalysisService::new(&config.analysis) {
        Ok(service) => {
            info!("[ANALYSIS] Using model {}", service.model());
            Arc::new(service)
        }
        Err(e) => {
            warn!("[ANALYSIS] {}; tastings will fail", e);
            Arc::new(UnavailableAnalysis::new(e.to_string()))
        }
    };

    let test_config = args.test_config.map(TestConfig::load).transpose()?;

    info!("Starting Vibe Sommelier");

    let controller = SessionController::new(camera, analyzer, config);
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 820.0])
            .with_min_inner_size([560.0, 640.0])
            .with_title("The Vibe Sommelier")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "The Vibe Sommelier",
        options,
        Box::new(move |cc| {
            Ok(Box::new(SommelierApp::new(
                cc,
                controller,
                handle,
                test_config,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI failed: {}", e))
}

/// Run one upload through the session and print the tasting note
async fn analyze_file(controller: &SessionController, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    controller.select_file(bytes).await;
    let snapshot = controller.snapshot();
    controller.shutdown();

    match snapshot.analysis {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        None => anyhow::bail!(
            "{}",
            snapshot
                .error_message()
                .unwrap_or("analysis did not complete")
        ),
    }
}
