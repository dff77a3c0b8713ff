// THEORY:
// The `pipeline` module is the top-level API of the crate. It takes a plain
// configuration record and runs the whole effect from an input file to an
// output file:
//
//   load -> rescale -> gamma -> (rgb shift) -> Gleitzsch operator -> (interlace) -> save
//
// The operator itself only sees intensity arrays and a `LossyRoundTrip`; the
// pipeline owns everything around it: file I/O, preprocessing and the optional
// stylistic filters. The output file is only touched once every stage has
// succeeded.

use crate::core_modules::contrast::{DEFAULT_LEFT_PERCENTILE, DEFAULT_RIGHT_PERCENTILE};
use crate::core_modules::filters::{apply_rgb_shift, interlace};
use crate::core_modules::lame::{LameRoundTrip, LossyRoundTrip};
use crate::core_modules::operator::{DEFAULT_RGB_SHIFT, GleitzschOperator};
use crate::core_modules::preprocess::{DEFAULT_GAMMA, DEFAULT_IMAGE_SIZE, preprocess};
use crate::core_modules::raster::{to_image, to_intensity_array};
use crate::core_modules::utils::image_helper;
use crate::error::{GleitzschError, Result};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Configuration for a single Gleitzsch run.
#[derive(Debug, Clone)]
pub struct GleitzschConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Target length of the longer image side, in pixels.
    pub image_size: u32,
    /// Where intermediate codec files go. `None` uses a throwaway directory;
    /// a supplied directory keeps every intermediate file for inspection.
    pub temp_dir: Option<PathBuf>,
    /// Per-channel spatial shift step used inside the operator.
    pub rgb_shift: u32,
    /// Preprocessing gamma; values above 1 brighten.
    pub gamma: f64,
    pub left_percentile: f64,
    pub right_percentile: f64,
    /// Step of the optional image-level RGB shift before the operator. 0 disables it.
    pub pre_shift: u32,
    /// Band height of the optional interlace filter after the operator.
    pub interlace: Option<u32>,
}

impl Default for GleitzschConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            image_size: DEFAULT_IMAGE_SIZE,
            temp_dir: None,
            rgb_shift: DEFAULT_RGB_SHIFT,
            gamma: DEFAULT_GAMMA,
            left_percentile: DEFAULT_LEFT_PERCENTILE,
            right_percentile: DEFAULT_RIGHT_PERCENTILE,
            pre_shift: 0,
            interlace: None,
        }
    }
}

impl GleitzschConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GleitzschError::InvalidConfig(msg.to_string()));
        if self.image_size == 0 {
            return invalid("image size must be positive");
        }
        if self.gamma.is_nan() || self.gamma <= 0.0 {
            return invalid("gamma must be positive");
        }
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.left_percentile) || !in_range(self.right_percentile) {
            return invalid("percentiles must lie within [0, 100]");
        }
        if self.left_percentile >= self.right_percentile {
            return invalid("left percentile must be below right percentile");
        }
        if self.rgb_shift >= self.image_size || self.pre_shift >= self.image_size {
            return invalid("shifts must be smaller than the image size");
        }
        if self.interlace == Some(0) {
            return invalid("interlace band height must be positive");
        }
        Ok(())
    }
}

/// The whole effect, from input file to output file.
pub struct GleitzschPipeline {
    config: GleitzschConfig,
    operator: GleitzschOperator,
}

impl GleitzschPipeline {
    /// Validates `config`, then looks up the `lame` codec and prepares the scratch space.
    /// An invalid config is reported without touching the system.
    pub fn new(config: GleitzschConfig) -> Result<Self> {
        config.validate()?;
        let codec = LameRoundTrip::new(config.temp_dir.as_deref())?;
        Ok(Self::with_codec(config, Arc::new(codec)))
    }

    /// Builds a pipeline around an arbitrary codec. `config` is taken as already validated.
    pub fn with_codec(config: GleitzschConfig, codec: Arc<dyn LossyRoundTrip>) -> Self {
        let operator = GleitzschOperator::new(codec)
            .with_channel_shift_step(config.rgb_shift)
            .with_percentiles(config.left_percentile, config.right_percentile);
        Self { config, operator }
    }

    pub fn config(&self) -> &GleitzschConfig {
        &self.config
    }

    /// Runs every stage after loading, in memory.
    pub async fn process(&self, image: RgbImage) -> Result<RgbImage> {
        let prepared = preprocess(&image, self.config.image_size, self.config.gamma);
        let prepared = apply_rgb_shift(prepared, self.config.pre_shift).await?;

        let glitched = self.operator.apply(to_intensity_array(&prepared)).await?;
        let output = to_image(&glitched);

        Ok(match self.config.interlace {
            Some(coeff) => interlace(&output, coeff),
            None => output,
        })
    }

    /// Loads the input, processes it and writes the output.
    pub async fn run(&self) -> Result<()> {
        info!("loading {}", self.config.input_path.display());
        let image = image_helper::load(&self.config.input_path)?;
        let output = self.process(image).await?;
        image_helper::save(&output, &self.config.output_path)?;
        info!("saved {}", self.config.output_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::lame::IdentityRoundTrip;
    use image::Rgb;

    fn identity_pipeline(config: GleitzschConfig) -> GleitzschPipeline {
        GleitzschPipeline::with_codec(config, Arc::new(IdentityRoundTrip))
    }

    #[test]
    fn defaults_are_valid() {
        let config = GleitzschConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.image_size, 1024);
        assert_eq!(config.rgb_shift, 8);
        assert_eq!(config.gamma, 10.0);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            GleitzschConfig { image_size: 0, ..Default::default() },
            GleitzschConfig { gamma: 0.0, ..Default::default() },
            GleitzschConfig { gamma: f64::NAN, ..Default::default() },
            GleitzschConfig { left_percentile: -1.0, ..Default::default() },
            GleitzschConfig { right_percentile: 101.0, ..Default::default() },
            GleitzschConfig { left_percentile: 60.0, right_percentile: 40.0, ..Default::default() },
            GleitzschConfig { interlace: Some(0), ..Default::default() },
            GleitzschConfig { rgb_shift: u32::MAX / 2 + 1, ..Default::default() },
            GleitzschConfig { image_size: 16, rgb_shift: 16, ..Default::default() },
            GleitzschConfig { image_size: 16, pre_shift: 40, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(GleitzschError::InvalidConfig(_))));
        }
    }

    #[test]
    fn new_rejects_bad_config_before_looking_for_the_codec() {
        let config = GleitzschConfig { image_size: 0, ..Default::default() };
        assert!(matches!(
            GleitzschPipeline::new(config),
            Err(GleitzschError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn process_resizes_to_target() {
        let config = GleitzschConfig { image_size: 32, gamma: 1.0, ..Default::default() };
        let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8 * 4, y as u8 * 5, 90]));
        let out = identity_pipeline(config).process(image).await.unwrap();
        assert_eq!(out.dimensions(), (32, 24));
    }

    #[tokio::test]
    async fn run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        let image = RgbImage::from_fn(20, 10, |x, y| Rgb([x as u8 * 12, y as u8 * 25, 60]));
        image_helper::save(&image, &input).unwrap();

        let config = GleitzschConfig {
            input_path: input,
            output_path: output.clone(),
            image_size: 20,
            pre_shift: 1,
            interlace: Some(2),
            ..Default::default()
        };
        identity_pipeline(config).run().await.unwrap();

        let written = image_helper::load(&output).unwrap();
        assert_eq!(written.dimensions(), (20, 10));
    }

    #[tokio::test]
    async fn failed_run_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        let config = GleitzschConfig {
            input_path: dir.path().join("missing.png"),
            output_path: output.clone(),
            ..Default::default()
        };
        assert!(identity_pipeline(config).run().await.is_err());
        assert!(!output.exists());
    }
}
