//! Tool configuration module.
//!
//! Handles loading, validating, and merging `banner-press.toml`. Stock defaults
//! are overridden by the user file, and command-line flags override both.
//!
//! ## Config File Location
//!
//! Either passed explicitly with `--config FILE`, or `banner-press.toml` in the
//! working directory when present.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [stitch]
//! ratio_top = 2.35          # width/height of the top crop
//! ratio_bottom = 1.0        # width/height of the bottom crop
//! background = "opaque"     # "opaque" (white) or "transparent"
//! min_region = 50           # smallest crop side, in display pixels
//! export_quality = 90       # JPEG quality when saving a banner as .jpg
//!
//! [compression]
//! ceiling_mb = 10           # target maximum output size
//! quality = 80              # starting JPEG quality (1-100)
//! png_strategy = "force-jpeg"  # or "keep-png"
//!
//! [policy]
//! quality_step = 5
//! quality_floor = 10
//! held_quality_floor = 70
//! scale_factor = 0.9
//! min_dimension = 100
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [compression]
//! ceiling_mb = 2
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    AspectRatio, Background, CompressionPolicy, CompressionSpec, PngStrategy, Quality,
};
use crate::stitch::StitchSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "banner-press.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `banner-press.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Crop ratios and canvas settings for `stitch`.
    pub stitch: StitchConfig,
    /// Ceiling, starting quality and PNG handling for `compress` and `batch`.
    pub compression: CompressionConfig,
    /// Search constants for the compressor.
    pub policy: CompressionPolicy,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Validation(msg.into()))
        };

        for (name, ratio) in [
            ("stitch.ratio_top", self.stitch.ratio_top),
            ("stitch.ratio_bottom", self.stitch.ratio_bottom),
        ] {
            if AspectRatio::new(ratio).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a positive number"
                )));
            }
        }
        if self.stitch.min_region == 0 {
            return invalid("stitch.min_region must be non-zero");
        }
        if !(1..=100).contains(&self.stitch.export_quality) {
            return invalid("stitch.export_quality must be 1-100");
        }
        if self.compression.ceiling_mb == 0 {
            return invalid("compression.ceiling_mb must be non-zero");
        }
        if !(1..=100).contains(&self.compression.quality) {
            return invalid("compression.quality must be 1-100");
        }
        if self.policy.quality_step == 0 {
            return invalid("policy.quality_step must be non-zero");
        }
        if self.policy.held_quality_floor > 100 {
            return invalid("policy.held_quality_floor must be 0-100");
        }
        if !(self.policy.scale_factor > 0.0 && self.policy.scale_factor < 1.0) {
            return invalid("policy.scale_factor must be between 0 and 1 (exclusive)");
        }
        if self.policy.min_dimension == 0 {
            return invalid("policy.min_dimension must be non-zero");
        }
        Ok(())
    }

    /// Pipeline settings for `stitch`.
    pub fn stitch_settings(&self) -> Result<StitchSettings, ConfigError> {
        let ratio = |name: &str, value: f64| {
            AspectRatio::new(value).ok_or_else(|| {
                ConfigError::Validation(format!("{name} must be a positive number"))
            })
        };
        Ok(StitchSettings {
            ratio_top: ratio("stitch.ratio_top", self.stitch.ratio_top)?,
            ratio_bottom: ratio("stitch.ratio_bottom", self.stitch.ratio_bottom)?,
            min_region: self.stitch.min_region,
            export_quality: Quality::new(self.stitch.export_quality),
        })
    }

    /// The compression request described by `[compression]`.
    pub fn compression_spec(&self) -> Result<CompressionSpec, ConfigError> {
        CompressionSpec::from_megabytes(
            self.compression.ceiling_mb,
            Quality::new(self.compression.quality),
            self.compression.png_strategy,
        )
        .ok_or_else(|| ConfigError::Validation("compression.ceiling_mb is out of range".into()))
    }
}

/// Settings for the crop-and-stitch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StitchConfig {
    pub ratio_top: f64,
    pub ratio_bottom: f64,
    pub background: Background,
    /// Minimum crop side in display pixels.
    pub min_region: u32,
    pub export_quality: u32,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            ratio_top: 2.35,
            ratio_bottom: 1.0,
            background: Background::Opaque,
            min_region: 50,
            export_quality: 90,
        }
    }
}

/// Settings for the adaptive compressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Output ceiling in megabytes (MiB).
    pub ceiling_mb: u64,
    /// Starting JPEG quality.
    pub quality: u32,
    pub png_strategy: PngStrategy,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            ceiling_mb: 10,
            quality: 80,
            png_strategy: PngStrategy::ForceJpeg,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel compression workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the tool config.
///
/// An explicit path must exist. Without one, `banner-press.toml` in `cwd` is
/// used when present and stock defaults otherwise. User values are merged on
/// top of stock defaults, unknown keys are rejected, and the result validated.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<ToolConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(&cwd.join(CONFIG_FILE_NAME))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `banner-press.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# banner-press configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Looked up as ./banner-press.toml, or passed with --config FILE.
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Stitch: two crops stacked into one banner
# ---------------------------------------------------------------------------
[stitch]
# Width/height of the top crop. 2.35 is a cinema-style banner.
ratio_top = 2.35

# Width/height of the bottom crop. 1.0 is a square.
ratio_bottom = 1.0

# Canvas fill: "opaque" (white, RGB) or "transparent" (RGBA).
background = "opaque"

# Smallest allowed crop side, in display pixels.
min_region = 50

# JPEG quality used when the banner is saved with a .jpg extension.
export_quality = 90

# ---------------------------------------------------------------------------
# Compression: fit images under a size ceiling
# ---------------------------------------------------------------------------
[compression]
# Target maximum output size in megabytes (1 MB = 1048576 bytes).
ceiling_mb = 10

# Starting JPEG quality (1 = worst, 100 = best).
quality = 80

# "force-jpeg" flattens PNG/GIF onto white and writes JPEG.
# "keep-png" keeps the source format and its transparency.
png_strategy = "force-jpeg"

# ---------------------------------------------------------------------------
# Search policy
# ---------------------------------------------------------------------------
[policy]
# Quality decrement per attempt while stepping quality down.
quality_step = 5

# Qualities at or below this value are never tried.
quality_floor = 10

# Resizing encodes at max(starting quality, held_quality_floor).
held_quality_floor = 70

# Each resize attempt multiplies both dimensions by this factor.
scale_factor = 0.9

# Resizing stops before either dimension drops below this many pixels.
min_dimension = 100

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel compression workers for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
