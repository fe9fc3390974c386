use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facemesh_core::{
    resize_to_max_width, to_display, to_internal, DetectionResult, DrawStyle, FaceMeshConfig, FaceMeshDetector,
    OrtFaceMesh, TOTAL_LANDMARKS,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facemesh", about = "Face landmark detector: draws the face mesh and measures expressions")]
struct Cli {
    /// TOML config file (FACEMESH_* environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect landmarks in a photo and report expression metrics
    Detect {
        /// Image to analyze (JPG or PNG)
        input: PathBuf,
        /// Visualization style: points, mesh or contours
        #[arg(short, long, default_value = "points")]
        style: DrawStyle,
        /// Write the rendered image here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Downscale images wider than this
        #[arg(long)]
        max_width: Option<u32>,
        /// Face-landmark ONNX model
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Print the detection result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Detect {
            input,
            style,
            output,
            max_width,
            model,
            json,
        } => {
            let mut config = config;
            if let Some(path) = model {
                config.model_path = path;
            }
            if let Some(w) = max_width {
                config.max_width = w;
            }
            run_detect(&config, &input, style, output.as_deref(), json)?;
        }
        Commands::Config => {
            print!("{}", toml::to_string(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FaceMeshConfig> {
    let config = match path {
        Some(p) => FaceMeshConfig::load(p)?,
        None => FaceMeshConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn run_detect(
    config: &FaceMeshConfig,
    input: &Path,
    style: DrawStyle,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let decoded = image::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let image = resize_to_max_width(&to_internal(&decoded), config.max_width)?;
    tracing::info!(
        path = %input.display(),
        width = image.width(),
        height = image.height(),
        %style,
        "image loaded"
    );

    let model = OrtFaceMesh::load(config)?;
    let mut detector = FaceMeshDetector::new(model);
    let detection = detector.detect(&image, style)?;
    detector.release();

    if let Some(path) = output {
        to_display(&detection.image)
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "rendered image written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&detection.result)?);
    } else {
        print_report(&detection.result, style);
    }

    Ok(())
}

fn print_report(result: &DetectionResult, style: DrawStyle) {
    let Some(ex) = result.expressions.filter(|_| result.success) else {
        println!("No face detected in the image.");
        println!("Tips:");
        println!("  - make sure the face is well lit");
        println!("  - the face should look towards the camera");
        println!("  - try a higher quality image");
        return;
    };

    println!("Detection successful ({style})");
    println!();
    println!("Faces detected:     {}", result.faces_detected);
    println!("Landmarks detected: {}/{TOTAL_LANDMARKS}", result.total_landmarks);
    println!("Coverage:           {:.1}%", result.landmark_coverage_pct());
    println!();
    println!("Expressions (pixels)");
    println!("Mouth opening:      {} px", ex.mouth_opening_px);
    println!("Eye opening (avg):  {} px", ex.eye_opening_px);
    println!(
        "Head tilt:          {} px ({})",
        ex.head_tilt_px.abs(),
        ex.tilt_direction()
    );
}
