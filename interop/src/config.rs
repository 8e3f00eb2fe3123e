use denoise::{DenoiseConfig, DeviceType};

/// Denoise settings as the host lays them out. `device_type` uses the engine's
/// numbering: 0 default, 1 CPU, 2 SYCL, 3 CUDA, 4 HIP, 5 Metal.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiDenoiseConfig {
    pub num_threads: i32,
    pub quality: i32,
    pub max_memory_mb: i32,
    pub hdr: bool,
    pub srgb: bool,
    pub input_scale: f32,
    pub device_type: i32,
}

impl Default for FfiDenoiseConfig {
    fn default() -> Self {
        DenoiseConfig::default().into()
    }
}

impl From<DenoiseConfig> for FfiDenoiseConfig {
    fn from(config: DenoiseConfig) -> Self {
        FfiDenoiseConfig {
            num_threads: config.num_threads,
            quality: config.quality,
            max_memory_mb: config.max_memory_mb,
            hdr: config.hdr,
            srgb: config.srgb,
            input_scale: config.input_scale,
            device_type: config.device_type.as_raw(),
        }
    }
}

impl TryFrom<FfiDenoiseConfig> for DenoiseConfig {
    type Error = i32;

    /// Fails with the raw device type when it is not a known backend.
    fn try_from(config: FfiDenoiseConfig) -> Result<Self, Self::Error> {
        let device_type =
            DeviceType::from_raw(config.device_type).ok_or(config.device_type)?;

        Ok(DenoiseConfig {
            num_threads: config.num_threads,
            quality: config.quality,
            max_memory_mb: config.max_memory_mb,
            hdr: config.hdr,
            srgb: config.srgb,
            input_scale: config.input_scale,
            device_type,
        })
    }
}
