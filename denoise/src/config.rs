use serde::{Deserialize, Serialize};

use crate::engine::DeviceType;
use crate::error::Result;

/// Quality presets of the RT filter. The raw value is passed to the engine
/// unchanged, so tiers unknown to this enum can still be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum QualityTier {
    Default = 0,
    Fast = 4,
    Balanced = 5,
    High = 6,
}

impl From<QualityTier> for i32 {
    fn from(tier: QualityTier) -> i32 {
        tier as i32
    }
}

/// Per-call filter and device settings.
///
/// Integer settings at 0 or below and an input scale at 0 or below are unset:
/// the engine keeps its own default and the parameter is never sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    pub num_threads: i32,
    pub quality: i32,
    pub max_memory_mb: i32,
    pub hdr: bool,
    pub srgb: bool,
    pub input_scale: f32,
    pub device_type: DeviceType,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            quality: QualityTier::Default.into(),
            max_memory_mb: 0,
            hdr: false,
            srgb: false,
            input_scale: 0.0,
            device_type: DeviceType::Cpu,
        }
    }
}

impl DenoiseConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn with_quality(mut self, tier: QualityTier) -> Self {
        self.quality = tier.into();
        self
    }

    pub(crate) fn num_threads(&self) -> Option<i32> {
        (self.num_threads > 0).then_some(self.num_threads)
    }

    pub(crate) fn quality(&self) -> Option<i32> {
        (self.quality > 0).then_some(self.quality)
    }

    pub(crate) fn max_memory_mb(&self) -> Option<i32> {
        (self.max_memory_mb > 0).then_some(self.max_memory_mb)
    }

    pub(crate) fn input_scale(&self) -> Option<f32> {
        (self.input_scale > 0.0).then_some(self.input_scale)
    }
}
