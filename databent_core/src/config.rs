use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons a `SafeZoneConfig` is rejected before any byte is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Fraction `{name}` must be a finite value in [0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },

    /// The fractions must satisfy
    /// `head_protect < zone_start < zone_end < 1 - tail_protect`.
    #[error(
        "Glitch zone {zone_start}..{zone_end} must sit strictly inside the protected bounds {head_protect}..{tail_bound}"
    )]
    ZoneOrdering {
        head_protect: f64,
        zone_start: f64,
        zone_end: f64,
        tail_bound: f64,
    },

    #[error("min-chunk ({min}) must not exceed max-chunk ({max})")]
    ChunkBounds { min: usize, max: usize },

    #[error("min-chunk-count ({min}) must not exceed target-chunk-count ({target})")]
    ChunkCountBounds { min: usize, target: usize },
}

/// Where deletions may start and how large they are, expressed relative to the
/// buffer length at each step.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SafeZoneConfig {
    /// Leading share of the file (header, IFD pointer) that must survive.
    #[serde(default = "default_head_protect")]
    pub head_protect: f64,
    /// Trailing share of the file (trailing tags) that must survive.
    #[serde(default = "default_tail_protect")]
    pub tail_protect: f64,
    #[serde(default = "default_zone_start")]
    pub zone_start: f64,
    #[serde(default = "default_zone_end")]
    pub zone_end: f64,
    #[serde(default = "default_min_chunk")]
    pub min_chunk: usize,
    #[serde(default = "default_max_chunk")]
    pub max_chunk: usize,
    #[serde(default = "default_target_chunk_count")]
    pub target_chunk_count: usize,
    /// When set, the number of chunks is drawn per seed from
    /// `[min_chunk_count, target_chunk_count]` instead of being fixed.
    #[serde(default)]
    pub min_chunk_count: Option<usize>,
}

pub fn default_head_protect() -> f64 {
    0.02
}
pub fn default_tail_protect() -> f64 {
    0.02
}
pub fn default_zone_start() -> f64 {
    0.30
}
pub fn default_zone_end() -> f64 {
    0.70
}
pub fn default_min_chunk() -> usize {
    20
}
pub fn default_max_chunk() -> usize {
    300
}
pub fn default_target_chunk_count() -> usize {
    10
}

impl Default for SafeZoneConfig {
    fn default() -> Self {
        Self {
            head_protect: default_head_protect(),
            tail_protect: default_tail_protect(),
            zone_start: default_zone_start(),
            zone_end: default_zone_end(),
            min_chunk: default_min_chunk(),
            max_chunk: default_max_chunk(),
            target_chunk_count: default_target_chunk_count(),
            min_chunk_count: None,
        }
    }
}

impl SafeZoneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("head-protect", self.head_protect),
            ("tail-protect", self.tail_protect),
            ("zone-start", self.zone_start),
            ("zone-end", self.zone_end),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }

        let tail_bound = 1.0 - self.tail_protect;
        if !(self.head_protect < self.zone_start
            && self.zone_start < self.zone_end
            && self.zone_end < tail_bound)
        {
            return Err(ConfigError::ZoneOrdering {
                head_protect: self.head_protect,
                zone_start: self.zone_start,
                zone_end: self.zone_end,
                tail_bound,
            });
        }

        if self.min_chunk > self.max_chunk {
            return Err(ConfigError::ChunkBounds {
                min: self.min_chunk,
                max: self.max_chunk,
            });
        }

        if let Some(min) = self.min_chunk_count {
            if min > self.target_chunk_count {
                return Err(ConfigError::ChunkCountBounds {
                    min,
                    target: self.target_chunk_count,
                });
            }
        }
        Ok(())
    }

    /// Byte offsets of the glitch zone for a buffer of `len` bytes.
    pub fn zone_bounds(&self, len: usize) -> (usize, usize) {
        let start = (len as f64 * self.zone_start).floor() as usize;
        let end = (len as f64 * self.zone_end).floor() as usize;
        (start, end)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct VariantSettings {
    /// Seed of the first variant. Left unset, a fresh one is drawn by
    /// [`VariantSettings::pin_base_seed`].
    #[serde(default)]
    pub base_seed: Option<u64>,
    #[serde(default = "default_variant_count")]
    pub count: u64,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

pub fn default_variant_count() -> u64 {
    5
}
pub fn default_threads() -> usize {
    1
}

/// Exclusive upper bound for drawn base seeds, small enough to retype by hand.
const DRAWN_SEED_LIMIT: u64 = 100_000;

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            base_seed: None,
            count: default_variant_count(),
            threads: default_threads(),
        }
    }
}

impl VariantSettings {
    /// Fixes the base seed, drawing one from `rng` if none was configured.
    ///
    /// # Returns
    /// The base seed the variants will use. Later calls return the same value.
    pub fn pin_base_seed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u64 {
        *self
            .base_seed
            .get_or_insert_with(|| rng.random_range(0..DRAWN_SEED_LIMIT))
    }

    /// Seeds in generation order: `base_seed + i` for each variant. An unset
    /// base seed counts from 0.
    pub fn seeds(&self) -> impl Iterator<Item = u64> + '_ {
        let base = self.base_seed.unwrap_or_default();
        (0..self.count).map(move |i| base.wrapping_add(i))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_write_json")]
    pub write_json: bool,
}

pub fn default_output_directory() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_write_json() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            write_json: default_write_json(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DatabentConfig {
    #[serde(default)]
    pub glitch: SafeZoneConfig,
    #[serde(default)]
    pub variants: VariantSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

impl DatabentConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to load config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: DatabentConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.glitch.validate()?;
        Ok(config)
    }
}
