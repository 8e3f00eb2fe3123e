use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::config::DenoiseConfig;
use crate::engine::{names, DenoiseEngine};
use crate::error::{Error, Result};
use crate::lifecycle::{Device, Filter};
use crate::pinned::PinnedBuffer;

const CHANNELS: usize = 3;

/// Where the filter weights come from.
#[derive(Debug, Clone, Default)]
pub enum WeightsSource<'p> {
    /// Weights built into the engine.
    #[default]
    EngineDefault,
    /// Read the whole file. A file that cannot be read or is empty fails the
    /// call instead of falling back to the built-in weights.
    File(&'p Path),
    /// An already loaded payload. Empty means the built-in weights.
    Bytes(Vec<u8>),
}

impl WeightsSource<'_> {
    fn load(self) -> Result<Vec<u8>> {
        match self {
            WeightsSource::EngineDefault => Ok(Vec::new()),
            WeightsSource::File(path) => common::file_utils::read_all_bytes(path).map_err(
                |source| Error::WeightsUnavailable {
                    path: path.to_path_buf(),
                    source,
                },
            ),
            WeightsSource::Bytes(bytes) => Ok(bytes),
        }
    }
}

/// Runs the learned denoising filter in place over interleaved RGB float
/// buffers, one device and one filter per call.
///
/// `try_*` methods report which step failed. [`DenoiseBridge::denoise_buffer`]
/// and [`DenoiseBridge::denoise_raw`] keep the uniform outcome of the managed
/// boundary: the buffer back, or nothing.
#[derive(Debug)]
pub struct DenoiseBridge<E> {
    engine: E,
}

impl<E: DenoiseEngine> DenoiseBridge<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn device_count(&self) -> i32 {
        self.engine.physical_device_count()
    }

    /// Name of the first physical device, `"none"` when there is no device and
    /// `"CPU"` when the engine does not report a name.
    pub fn device_name(&self) -> String {
        if self.device_count() <= 0 {
            return "none".to_string();
        }

        self.engine
            .physical_device_string(0, names::PHYSICAL_DEVICE_NAME)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "CPU".to_string())
    }

    pub fn try_denoise(
        &self,
        pixels: &mut [f32],
        width: u32,
        height: u32,
        weights: WeightsSource<'_>,
        config: &DenoiseConfig,
    ) -> Result<()> {
        let outcome = check_length(pixels.len(), width, height)
            .and_then(|()| weights.load())
            .and_then(|weights| self.run(PinnedBuffer::pin(pixels), width, height, weights, config));

        outcome.inspect_err(|err| tracing::error!("Denoise failed: {}", err))
    }

    /// [`DenoiseBridge::try_denoise`] over caller memory addressed by pointer.
    ///
    /// # Safety
    /// A non-null, aligned `data` must point to `len` initialized floats that
    /// nothing else accesses during the call.
    pub unsafe fn try_denoise_raw(
        &self,
        data: *mut f32,
        len: usize,
        width: u32,
        height: u32,
        weights: WeightsSource<'_>,
        config: &DenoiseConfig,
    ) -> Result<()> {
        let outcome = check_length(len, width, height)
            .and_then(|()| weights.load())
            .and_then(|weights| {
                let pinned = PinnedBuffer::from_raw(data, len)?;
                self.run(pinned, width, height, weights, config)
            });

        outcome.inspect_err(|err| tracing::error!("Denoise failed: {}", err))
    }

    /// Denoises `pixels` in place and hands the same buffer back, or `None` on
    /// any failure, including a panic inside the engine.
    pub fn denoise_buffer<'b>(
        &self,
        pixels: &'b mut [f32],
        width: u32,
        height: u32,
        weights: WeightsSource<'_>,
        config: &DenoiseConfig,
    ) -> Option<&'b mut [f32]> {
        let done = contain_panic(|| self.try_denoise(&mut *pixels, width, height, weights, config));
        done.then_some(pixels)
    }

    /// # Safety
    /// Same contract as [`DenoiseBridge::try_denoise_raw`].
    pub unsafe fn denoise_raw(
        &self,
        data: *mut f32,
        len: usize,
        width: u32,
        height: u32,
        weights: WeightsSource<'_>,
        config: &DenoiseConfig,
    ) -> bool {
        contain_panic(|| self.try_denoise_raw(data, len, width, height, weights, config))
    }

    fn run(
        &self,
        mut pinned: PinnedBuffer<'_>,
        width: u32,
        height: u32,
        weights: Vec<u8>,
        config: &DenoiseConfig,
    ) -> Result<()> {
        let mut device = Device::new(&self.engine, config.device_type)?;
        if let Some(num_threads) = config.num_threads() {
            device.set_int(names::NUM_THREADS, num_threads);
        }
        let device = device.commit()?;

        let mut filter = Filter::new(&device, names::FILTER_RT)?;
        if !weights.is_empty() {
            tracing::debug!("Using custom weights ({} bytes)", weights.len());
            filter.bind_weights(weights);
        }
        pinned.keep_rollback();
        filter.bind_in_place(pinned.as_mut_slice(), width, height)?;

        filter.set_bool(names::HDR, config.hdr);
        filter.set_bool(names::SRGB, config.srgb);
        if let Some(quality) = config.quality() {
            filter.set_int(names::QUALITY, quality);
        }
        if let Some(max_memory_mb) = config.max_memory_mb() {
            filter.set_int(names::MAX_MEMORY_MB, max_memory_mb);
        }
        if let Some(input_scale) = config.input_scale() {
            filter.set_float(names::INPUT_SCALE, input_scale);
        }

        let filter = filter.commit()?;
        let filter = filter.execute()?;

        filter.release();
        device.release();
        pinned.commit();

        tracing::debug!("Denoised {}x{} pixels in place", width, height);

        Ok(())
    }
}

fn check_length(len: usize, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or(Error::InvalidDimensions { width, height })?;

    if len != expected {
        return Err(Error::LengthMismatch {
            width,
            height,
            expected,
            actual: len,
        });
    }

    Ok(())
}

fn contain_panic(denoise: impl FnOnce() -> Result<()>) -> bool {
    match catch_unwind(AssertUnwindSafe(denoise)) {
        Ok(outcome) => outcome.is_ok(),
        Err(_) => {
            tracing::error!("Unknown error during denoise: engine panicked");
            false
        }
    }
}
