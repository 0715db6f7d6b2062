//! face-overlay: visualize face detections over a photograph
//!
//! Command-line front end for the overlay core: runs the detection backend on
//! a still image and either prints the regions or composites translucent
//! marks over the picture.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use face_overlay_common::{Rgba, SurfaceSize};
use face_overlay_core::{DetectionSession, SharedDetector, TriggerOutcome};
use face_overlay_ultraface::{UltraFaceConfig, UltraFaceDetector};

#[derive(Parser)]
#[command(
    name = "face-overlay",
    version,
    about = "Detect faces in a photograph and draw translucent marks over them",
    after_help = "EXAMPLES:\n  \
                  # Print detected face regions\n  \
                  face-overlay detect photo.jpg --model ultraface-rfb320.onnx\n\n  \
                  # Same, as JSON\n  \
                  face-overlay detect photo.jpg --model ultraface-rfb320.onnx --json\n\n  \
                  # Composite marks over the picture, aspect-fit into a 375x667 surface\n  \
                  face-overlay render photo.jpg --model ultraface-rfb320.onnx \\\n      \
                  --surface-size 375x667 --output overlay.png"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection once and print the face regions
    Detect(DetectCommand),

    /// Run detection once and write the overlay composite as a PNG
    Render(RenderCommand),
}

#[derive(Args)]
struct DetectCommand {
    /// Input photograph (any format the image crate decodes)
    image: PathBuf,

    /// Path to the UltraFace RFB-320 ONNX model
    #[arg(short, long, default_value = "models/ultraface-rfb320.onnx")]
    model: PathBuf,

    /// Emit detections as JSON instead of a listing
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RenderCommand {
    /// Input photograph (any format the image crate decodes)
    image: PathBuf,

    /// Path to the UltraFace RFB-320 ONNX model
    #[arg(short, long, default_value = "models/ultraface-rfb320.onnx")]
    model: PathBuf,

    /// Output PNG with the overlay composited
    #[arg(short, long, default_value = "overlay.png")]
    output: PathBuf,

    /// Display-surface size as WIDTHxHEIGHT; defaults to the image's own size
    #[arg(long, value_name = "WxH")]
    surface_size: Option<String>,

    /// Mark fill color as RRGGBB hex
    #[arg(long, default_value = "00ff00")]
    color: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Detect(cmd) => cmd.execute().await,
        Commands::Render(cmd) => cmd.execute().await,
    }
}

impl DetectCommand {
    async fn execute(self) -> Result<()> {
        let detector = load_detector(&self.model)?;
        let picture = image::open(&self.image)
            .with_context(|| format!("failed to open {}", self.image.display()))?
            .to_rgb8();

        let faces = detector
            .detect(&picture)
            .await
            .context("face detection failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&faces)?);
        } else {
            println!("{} face(s) detected", faces.len());
            for (i, face) in faces.iter().enumerate() {
                println!(
                    "  {}: ({:.1}, {:.1}) {:.1}x{:.1}  confidence {:.2}",
                    i + 1,
                    face.region.x,
                    face.region.y,
                    face.region.width,
                    face.region.height,
                    face.confidence
                );
            }
        }

        Ok(())
    }
}

impl RenderCommand {
    async fn execute(self) -> Result<()> {
        let detector = load_detector(&self.model)?;
        let picture = image::open(&self.image)
            .with_context(|| format!("failed to open {}", self.image.display()))?
            .to_rgb8();

        let surface = match &self.surface_size {
            Some(spec) => parse_surface(spec)?,
            None => SurfaceSize::from(picture.dimensions()),
        };
        let color = parse_color(&self.color)?;

        let session = DetectionSession::new(detector, surface, color);
        session.set_image(picture);

        // A single trigger on a fresh session with the image set can only complete.
        if let TriggerOutcome::Completed { faces } = session.trigger().await {
            info!("{faces} face(s) marked");
        }

        let canvas = session
            .composite()
            .context("nothing to composite: no image displayed")?;
        canvas
            .save(&self.output)
            .with_context(|| format!("failed to write {}", self.output.display()))?;

        info!("overlay written to {}", self.output.display());
        Ok(())
    }
}

fn load_detector(model: &std::path::Path) -> Result<SharedDetector> {
    let detector = UltraFaceDetector::new(model, UltraFaceConfig::default())
        .with_context(|| format!("failed to load detection model {}", model.display()))?;
    Ok(Arc::new(detector))
}

/// Parse a `WIDTHxHEIGHT` surface specification.
fn parse_surface(spec: &str) -> Result<SurfaceSize> {
    let Some((width, height)) = spec.split_once(['x', 'X']) else {
        bail!("invalid surface size {spec:?}, expected WIDTHxHEIGHT");
    };

    let width: f32 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid surface width in {spec:?}"))?;
    let height: f32 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid surface height in {spec:?}"))?;

    let surface = SurfaceSize::new(width, height);
    if surface.is_degenerate() {
        bail!("surface dimensions must be positive, got {spec:?}");
    }
    Ok(surface)
}

/// Parse an `RRGGBB` hex color, with an optional leading `#`.
fn parse_color(spec: &str) -> Result<Rgba> {
    let hex = spec.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("invalid color {spec:?}, expected RRGGBB hex");
    }

    let channel = |range: std::ops::Range<usize>| -> Result<u8> {
        u8::from_str_radix(&hex[range], 16).with_context(|| format!("invalid color {spec:?}"))
    };

    Ok(Rgba::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_surface() {
        assert_eq!(parse_surface("375x667").unwrap(), SurfaceSize::new(375.0, 667.0));
        assert_eq!(parse_surface("100X50").unwrap(), SurfaceSize::new(100.0, 50.0));

        assert!(parse_surface("375").is_err());
        assert!(parse_surface("0x100").is_err());
        assert!(parse_surface("axb").is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("00ff00").unwrap(), Rgba::rgb(0, 255, 0));
        assert_eq!(parse_color("#ff8800").unwrap(), Rgba::rgb(255, 136, 0));

        assert!(parse_color("red").is_err());
        assert!(parse_color("fff").is_err());
    }
}
