//! Request contracts and search tuning.
//!
//! [`OutputContract`] is what a caller asks for; [`SearchConfig`] holds the
//! empirically tuned constants of the search (schedule, iteration limits,
//! acceptance ratios). Both deserialize from camelCase objects so they can be
//! passed straight from JavaScript.

use serde::{Deserialize, Serialize};

use crate::format::OutputFormat;
use crate::resize::FilterType;
use crate::CompressError;

/// Fidelity policy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Quality may be traded for size.
    #[default]
    Lossy,
    /// Pixel fidelity is preserved; only resolution may change to meet a budget.
    Lossless,
}

/// What the caller wants out of one compression request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputContract {
    pub mode: Mode,
    /// Quality 0-100. Used for single-pass encodes and as the search starting point.
    pub quality: u8,
    /// Byte budget. `None` (or `0`) encodes once at `quality`.
    pub target_bytes: Option<usize>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub output_format: OutputFormat,
}

impl Default for OutputContract {
    fn default() -> Self {
        Self {
            mode: Mode::Lossy,
            quality: 80,
            target_bytes: None,
            max_width: None,
            max_height: None,
            output_format: OutputFormat::Auto,
        }
    }
}

impl OutputContract {
    /// Create a lossy contract at the default quality.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    pub fn with_target_bytes(mut self, target: usize) -> Self {
        self.target_bytes = Some(target);
        self
    }

    pub fn with_max_dimensions(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// The effective byte budget; a zero budget means "none".
    pub fn budget(&self) -> Option<usize> {
        self.target_bytes.filter(|&target| target > 0)
    }

    /// Quality on the 0-1 scale, floored at `min_quality`.
    pub fn normalized_quality(&self, config: &SearchConfig) -> f32 {
        (f32::from(self.quality.min(100)) / 100.0).clamp(config.min_quality, config.max_quality)
    }
}

/// Tuned constants of the size search.
///
/// Defaults reproduce the engine's shipped behaviour; every value can be
/// re-tuned per codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Lowest quality the search will try (0-1 scale).
    pub min_quality: f32,
    /// Highest quality the search will try (0-1 scale).
    pub max_quality: f32,
    /// Iteration cap when searching upward from a fitting start.
    pub upward_iterations: u32,
    /// Iteration cap when searching downward from an over-budget start.
    pub downward_iterations: u32,
    /// Stop when the quality bracket gets narrower than this.
    pub min_bracket: f32,
    /// A fitting result at or above `accept_ratio * budget` ends the search early.
    pub accept_ratio: f32,
    /// Descending scale factors tried when quality alone cannot meet the budget.
    pub scale_schedule: Vec<f32>,
    /// Safety margin applied to the final extrapolated scale.
    pub extrapolation_margin: f32,
    /// Guard decrement while quality is above `guard_fine_below`.
    pub guard_coarse_step: f32,
    /// Guard decrement at or below `guard_fine_below`.
    pub guard_fine_step: f32,
    pub guard_fine_below: f32,
    /// The guard never encodes below this quality.
    pub guard_floor: f32,
    /// Channel bucket size at quality 0 for the PNG quantizer.
    pub quantize_max_step: u8,
    /// Filter used by every rescale step.
    pub filter: FilterType,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.01,
            max_quality: 1.0,
            upward_iterations: 8,
            downward_iterations: 16,
            min_bracket: 0.005,
            accept_ratio: 0.9,
            scale_schedule: vec![0.85, 0.72, 0.6, 0.5, 0.4, 0.32, 0.25, 0.2, 0.15, 0.1],
            extrapolation_margin: 0.9,
            guard_coarse_step: 0.1,
            guard_fine_step: 0.05,
            guard_fine_below: 0.5,
            guard_floor: 0.1,
            quantize_max_step: 64,
            filter: FilterType::CatmullRom,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that every parameter is in range and the schedule is strictly descending.
    pub fn validate(&self) -> Result<(), CompressError> {
        let unit = |name: &str, value: f32| {
            if value.is_finite() && (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(CompressError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {value}"
                )))
            }
        };

        unit("minQuality", self.min_quality)?;
        unit("maxQuality", self.max_quality)?;
        unit("minBracket", self.min_bracket)?;
        unit("acceptRatio", self.accept_ratio)?;
        unit("extrapolationMargin", self.extrapolation_margin)?;
        unit("guardCoarseStep", self.guard_coarse_step)?;
        unit("guardFineStep", self.guard_fine_step)?;
        unit("guardFineBelow", self.guard_fine_below)?;
        unit("guardFloor", self.guard_floor)?;

        if self.min_quality <= 0.0 || self.min_quality >= self.max_quality {
            return Err(CompressError::InvalidConfig(format!(
                "minQuality ({}) must be positive and below maxQuality ({})",
                self.min_quality, self.max_quality
            )));
        }
        if self.min_bracket <= 0.0 {
            return Err(CompressError::InvalidConfig(
                "minBracket must be positive".to_string(),
            ));
        }
        if self.guard_coarse_step <= 0.0 || self.guard_fine_step <= 0.0 {
            return Err(CompressError::InvalidConfig(
                "guard steps must be positive".to_string(),
            ));
        }
        if self
            .scale_schedule
            .iter()
            .any(|&s| !s.is_finite() || s <= 0.0 || s >= 1.0)
        {
            return Err(CompressError::InvalidConfig(
                "scaleSchedule entries must be within (0, 1)".to_string(),
            ));
        }
        if self.scale_schedule.windows(2).any(|w| w[1] >= w[0]) {
            return Err(CompressError::InvalidConfig(
                "scaleSchedule must be strictly descending".to_string(),
            ));
        }
        Ok(())
    }
}
