use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facecam_core::{
    CascadeDetector, FramePipeline, MarkerMode, ModelStore, PipelineOptions, RemapOptions,
    RotationBucket,
};
use facecam_hw::{Camera, Frame};
use std::path::{Path, PathBuf};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facecam", about = "Face detection overlays for camera previews")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw face overlays onto a still image
    Annotate {
        /// Image to process
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the annotated image
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        overlay: OverlayArgs,
    },
    /// Capture camera frames, annotate them and write PNGs
    Preview {
        /// Number of frames to capture
        #[arg(short = 'n', long, default_value_t = 30)]
        frames: usize,
        /// Directory for the annotated frames
        #[arg(short, long)]
        output_dir: PathBuf,
        /// V4L2 device, overrides FACECAM_CAMERA_DEVICE
        #[arg(short, long)]
        device: Option<String>,
        #[command(flatten)]
        overlay: OverlayArgs,
    },
    /// Print the rotation bucket for an orientation reading
    Bucket {
        /// Orientation in degrees
        #[arg(allow_hyphen_values = true)]
        degrees: i32,
    },
    /// Copy the bundled cascade model into the model directory
    Provision,
    /// List V4L2 capture devices
    Devices,
}

#[derive(Args)]
struct OverlayArgs {
    /// Device orientation reading in degrees (270 applies no compensation)
    #[arg(long, default_value_t = 270, allow_hyphen_values = true)]
    orientation: i32,
    /// Detect on the full-resolution frame instead of the 480px working frame
    #[arg(long)]
    no_downscale: bool,
    /// Place the marker dot at the rectangle centre instead of its first corner
    #[arg(long)]
    centroid: bool,
    /// Offset for the 180° correction overlay, overrides FACECAM_ROTATION_180_FIX_PX
    #[arg(long, allow_hyphen_values = true)]
    rotation_180_fix: Option<f64>,
}

impl OverlayArgs {
    fn options(&self, config: &Config) -> PipelineOptions {
        PipelineOptions {
            downscale: config.downscale && !self.no_downscale,
            remap: RemapOptions {
                marker: if self.centroid {
                    MarkerMode::Centroid
                } else {
                    MarkerMode::UpperLeft
                },
                rotation_180_fix_px: self.rotation_180_fix.unwrap_or(config.rotation_180_fix_px),
            },
        }
    }

    fn rotation(&self) -> RotationBucket {
        RotationBucket::from_orientation(self.orientation)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Annotate {
            input,
            output,
            overlay,
        } => annotate(&config, &input, &output, &overlay)?,
        Commands::Preview {
            frames,
            output_dir,
            device,
            overlay,
        } => {
            let device = device.unwrap_or_else(|| config.camera_device.clone());
            preview(&config, &device, frames, &output_dir, &overlay)?;
        }
        Commands::Bucket { degrees } => {
            let bucket = RotationBucket::from_orientation(degrees);
            println!(
                "{}",
                serde_json::json!({ "orientation": degrees, "bucket": bucket })
            );
        }
        Commands::Provision => {
            let store = ModelStore::new(&config.model_dir);
            if store.is_provisioned() {
                println!("{} (already provisioned)", store.model_path().display());
            } else {
                let path = store.provision(&config.bundled_model)?;
                println!("{}", path.display());
            }
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for d in devices {
                println!("{}\t{}\t{}\t{}", d.path, d.name, d.driver, d.bus);
            }
        }
    }

    Ok(())
}

/// Build the pipeline, falling back to passthrough when the detector cannot
/// be set up.
fn build_pipeline(config: &Config, options: PipelineOptions) -> FramePipeline {
    let store = ModelStore::new(&config.model_dir);
    let detector = store
        .provision(&config.bundled_model)
        .map_err(anyhow::Error::from)
        .and_then(|path| CascadeDetector::load(&path).map_err(anyhow::Error::from));

    match detector {
        Ok(detector) => FramePipeline::new(Box::new(detector), options),
        Err(e) => {
            tracing::warn!(error = %e, "face detection disabled; frames pass through without overlay");
            FramePipeline::passthrough(options)
        }
    }
}

fn annotate(config: &Config, input: &Path, output: &Path, overlay: &OverlayArgs) -> Result<()> {
    let image = image::open(input).with_context(|| format!("reading {}", input.display()))?;
    let mut color = image.to_rgb8();
    let gray = image.to_luma8();

    let mut pipeline = build_pipeline(config, overlay.options(config));
    match pipeline.annotate(&mut color, &gray, overlay.rotation()) {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("{}: written without overlay", input.display()),
    }

    color
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn preview(
    config: &Config,
    device: &str,
    frames: usize,
    output_dir: &Path,
    overlay: &OverlayArgs,
) -> Result<()> {
    let camera = Camera::open(device, config.capture_width, config.capture_height)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut pipeline = build_pipeline(config, overlay.options(config));
    let mut stream = camera.stream()?;
    let mut faces_total = 0usize;

    for _ in 0..frames {
        let Frame {
            mut color,
            gray,
            sequence,
        } = stream.next_frame()?;

        // Read once per frame; the whole frame uses this bucket.
        let rotation = overlay.rotation();
        if let Some(report) = pipeline.annotate(&mut color, &gray, rotation) {
            faces_total += report.faces.len();
            tracing::debug!(sequence, faces = report.faces.len(), "annotated frame");
        }

        let path = output_dir.join(format!("frame_{sequence:06}.png"));
        color
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let overlays = if pipeline.is_passthrough() {
        "detector unavailable, no overlays".to_string()
    } else {
        format!("{faces_total} face overlays")
    };
    println!(
        "{frames} frames of {}x{} written to {} ({overlays})",
        camera.width,
        camera.height,
        output_dir.display()
    );
    Ok(())
}
