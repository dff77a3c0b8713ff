// Command-line front end for the `gleitzsch` library.

use anyhow::Context;
use clap::Parser;
use gleitzsch::core_modules::contrast::{DEFAULT_LEFT_PERCENTILE, DEFAULT_RIGHT_PERCENTILE};
use gleitzsch::core_modules::operator::DEFAULT_RGB_SHIFT;
use gleitzsch::core_modules::preprocess::{DEFAULT_GAMMA, DEFAULT_IMAGE_SIZE};
use gleitzsch::{GleitzschConfig, GleitzschPipeline};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gleitzsch", about = "Glitch an image by pushing its color channels through MP3")]
struct Cli {
    /// Path to the input image
    input: PathBuf,

    /// Path to the output image (format follows the extension, JPEG otherwise)
    output: PathBuf,

    /// Size of the processed image (long side)
    #[arg(short = 's', long, default_value_t = DEFAULT_IMAGE_SIZE)]
    image_size: u32,

    /// Keep intermediate codec files in this directory
    #[arg(short, long)]
    temp_dir: Option<PathBuf>,

    /// Per-channel shift applied before the codec round trip
    #[arg(short, long, default_value_t = DEFAULT_RGB_SHIFT)]
    rgb_shift: u32,

    /// Preprocessing gamma adjustment
    #[arg(short, long, default_value_t = DEFAULT_GAMMA)]
    gamma: f64,

    /// Lower contrast-stretch percentile
    #[arg(long, default_value_t = DEFAULT_LEFT_PERCENTILE)]
    left_percentile: f64,

    /// Upper contrast-stretch percentile
    #[arg(long, default_value_t = DEFAULT_RIGHT_PERCENTILE)]
    right_percentile: f64,

    /// Extra image-level RGB shift applied during preprocessing (0 = off)
    #[arg(long, default_value_t = 0)]
    pre_shift: u32,

    /// Darken alternating bands of this many rows
    #[arg(long)]
    interlace: Option<u32>,
}

impl From<Cli> for GleitzschConfig {
    fn from(cli: Cli) -> Self {
        Self {
            input_path: cli.input,
            output_path: cli.output,
            image_size: cli.image_size,
            temp_dir: cli.temp_dir,
            rgb_shift: cli.rgb_shift,
            gamma: cli.gamma,
            left_percentile: cli.left_percentile,
            right_percentile: cli.right_percentile,
            pre_shift: cli.pre_shift,
            interlace: cli.interlace,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Fails here, before any image work, when `lame` is not installed.
    let pipeline = GleitzschPipeline::new(cli.into()).context("could not start Gleitzsch")?;
    let output = pipeline.config().output_path.clone();
    pipeline
        .run()
        .await
        .with_context(|| format!("failed to produce {}", output.display()))?;
    Ok(())
}
