//! Owned engine handles whose type tracks the lifecycle stage.
//!
//! A [`Device`] goes `Created -> Committed`; a [`Filter`] can only be created
//! on a committed device and goes `Created -> Committed -> Executed`. Every
//! transition consumes the previous stage, so a step cannot be repeated or
//! skipped, and a failed transition drops the handle, which releases it.
//!
//! A filter borrows its device, so the device cannot be released while a
//! filter on it is alive.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;

use crate::engine::{names, DenoiseEngine, DeviceType, ImageFormat};
use crate::error::{Error, Result};

/// Stage before commit: parameters may still be set.
#[derive(Debug)]
pub struct Created;

/// Configuration is final.
#[derive(Debug)]
pub struct Committed;

/// The filter has run.
#[derive(Debug)]
pub struct Executed;

struct DeviceHandle<'e, E: DenoiseEngine> {
    engine: &'e E,
    raw: ManuallyDrop<E::Device>,
}

impl<E: DenoiseEngine> Drop for DeviceHandle<'_, E> {
    fn drop(&mut self) {
        // SAFETY: `raw` is taken exactly once, here, and never touched again.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        self.engine.release_device(raw);
        tracing::trace!("Device released");
    }
}

pub struct Device<'e, E: DenoiseEngine, S = Created> {
    handle: DeviceHandle<'e, E>,
    _state: PhantomData<S>,
}

impl<'e, E: DenoiseEngine> Device<'e, E, Created> {
    pub fn new(engine: &'e E, device_type: DeviceType) -> Result<Self> {
        let raw = engine
            .new_device(device_type)
            .ok_or(Error::DeviceCreation(device_type))?;

        tracing::trace!("{:?} device created", device_type);

        Ok(Device {
            handle: DeviceHandle {
                engine,
                raw: ManuallyDrop::new(raw),
            },
            _state: PhantomData,
        })
    }

    pub fn set_int(&mut self, name: &CStr, value: i32) {
        self.handle.engine.set_device_int(&self.handle.raw, name, value);
    }

    pub fn commit(self) -> Result<Device<'e, E, Committed>> {
        let engine = self.handle.engine;
        engine.commit_device(&self.handle.raw);

        if let Some(fault) = engine.take_device_error(&self.handle.raw) {
            return Err(Error::DeviceCommit(fault));
        }

        Ok(Device {
            handle: self.handle,
            _state: PhantomData,
        })
    }
}

impl<E: DenoiseEngine, S> Device<'_, E, S> {
    pub fn release(self) {
        drop(self);
    }
}

struct FilterHandle<'d, E: DenoiseEngine> {
    engine: &'d E,
    device: &'d E::Device,
    raw: ManuallyDrop<E::Filter>,
}

impl<E: DenoiseEngine> FilterHandle<'_, E> {
    fn check(&self, fail: fn(crate::EngineFault) -> Error) -> Result<()> {
        match self.engine.take_device_error(self.device) {
            Some(fault) => Err(fail(fault)),
            None => Ok(()),
        }
    }
}

impl<E: DenoiseEngine> Drop for FilterHandle<'_, E> {
    fn drop(&mut self) {
        // SAFETY: `raw` is taken exactly once, here, and never touched again.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        self.engine.release_filter(raw);
        tracing::trace!("Filter released");
    }
}

/// A filter bound to a committed device. `'b` is the borrow of the pixel
/// buffer the filter reads from and writes to.
pub struct Filter<'d, 'b, E: DenoiseEngine, S = Created> {
    handle: FilterHandle<'d, E>,
    // Shared with the engine until commit.
    weights: Option<Vec<u8>>,
    _pixels: PhantomData<&'b mut [f32]>,
    _state: PhantomData<S>,
}

impl<'d, 'b, E: DenoiseEngine> Filter<'d, 'b, E, Created> {
    pub fn new<'e: 'd>(device: &'d Device<'e, E, Committed>, filter_type: &CStr) -> Result<Self> {
        let engine: &'d E = device.handle.engine;
        let device_raw: &'d E::Device = &device.handle.raw;

        let raw = engine
            .new_filter(device_raw, filter_type)
            .ok_or_else(|| Error::FilterCreation(filter_type.to_string_lossy().into_owned()))?;

        tracing::trace!("'{}' filter created", filter_type.to_string_lossy());

        Ok(Filter {
            handle: FilterHandle {
                engine,
                device: device_raw,
                raw: ManuallyDrop::new(raw),
            },
            weights: None,
            _pixels: PhantomData,
            _state: PhantomData,
        })
    }

    /// Shares `weights` with the engine without copying. The bytes are kept
    /// alive by the filter and freed right after commit.
    pub fn bind_weights(&mut self, mut weights: Vec<u8>) {
        // SAFETY: the heap block does not move when the Vec is moved into
        // `self.weights`, and it is only freed after commit.
        unsafe {
            self.handle.engine.set_shared_filter_data(
                &self.handle.raw,
                names::WEIGHTS,
                weights.as_mut_ptr(),
                weights.len(),
            );
        }
        self.weights = Some(weights);
    }

    /// Binds `pixels` as both the color input and the output image, so the
    /// filter denoises in place.
    pub fn bind_in_place(&mut self, pixels: &'b mut [f32], width: u32, height: u32) -> Result<()> {
        let format = ImageFormat::Float3;
        let (w, h) = (width as usize, height as usize);
        let expected = w
            .checked_mul(h)
            .and_then(|n| n.checked_mul(format.channel_count()))
            .ok_or(Error::InvalidDimensions { width, height })?;

        if pixels.len() != expected {
            return Err(Error::LengthMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        let engine = self.handle.engine;
        let data = pixels.as_mut_ptr();

        // SAFETY: `data` covers `w * h` packed FLOAT3 pixels and the `'b`
        // borrow keeps it valid and exclusive for the filter's lifetime.
        unsafe {
            engine.set_shared_filter_image(&self.handle.raw, names::COLOR, data, format, w, h);
            engine.set_shared_filter_image(&self.handle.raw, names::OUTPUT, data, format, w, h);
        }

        Ok(())
    }

    pub fn set_bool(&mut self, name: &CStr, value: bool) {
        self.handle.engine.set_filter_bool(&self.handle.raw, name, value);
    }

    pub fn set_int(&mut self, name: &CStr, value: i32) {
        self.handle.engine.set_filter_int(&self.handle.raw, name, value);
    }

    pub fn set_float(&mut self, name: &CStr, value: f32) {
        self.handle.engine.set_filter_float(&self.handle.raw, name, value);
    }

    pub fn commit(mut self) -> Result<Filter<'d, 'b, E, Committed>> {
        self.handle.engine.commit_filter(&self.handle.raw);

        if let Some(weights) = self.weights.take() {
            tracing::trace!("Releasing {} bytes of weights after commit", weights.len());
        }

        self.handle.check(Error::FilterCommit)?;

        Ok(Filter {
            handle: self.handle,
            weights: None,
            _pixels: PhantomData,
            _state: PhantomData,
        })
    }
}

impl<'d, 'b, E: DenoiseEngine> Filter<'d, 'b, E, Committed> {
    pub fn execute(self) -> Result<Filter<'d, 'b, E, Executed>> {
        self.handle.engine.execute_filter(&self.handle.raw);
        self.handle.check(Error::Execution)?;

        Ok(Filter {
            handle: self.handle,
            weights: None,
            _pixels: PhantomData,
            _state: PhantomData,
        })
    }
}

impl<E: DenoiseEngine, S> Filter<'_, '_, E, S> {
    pub fn release(self) {
        drop(self);
    }
}
