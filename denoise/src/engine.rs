use std::ffi::CStr;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Object and parameter names understood by the engine.
pub mod names {
    use std::ffi::CStr;

    pub const FILTER_RT: &CStr = c"RT";

    pub const NUM_THREADS: &CStr = c"numThreads";

    pub const WEIGHTS: &CStr = c"weights";
    pub const COLOR: &CStr = c"color";
    pub const OUTPUT: &CStr = c"output";
    pub const HDR: &CStr = c"hdr";
    pub const SRGB: &CStr = c"srgb";
    pub const QUALITY: &CStr = c"quality";
    pub const MAX_MEMORY_MB: &CStr = c"maxMemoryMB";
    pub const INPUT_SCALE: &CStr = c"inputScale";

    pub const PHYSICAL_DEVICE_NAME: &CStr = c"name";
}

/// Execution backend of a device. CPU is the reference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum DeviceType {
    /// Let the engine pick the fastest available backend.
    Default = 0,
    #[default]
    Cpu = 1,
    Sycl = 2,
    Cuda = 3,
    Hip = 4,
    Metal = 5,
}

impl DeviceType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<DeviceType> {
        match raw {
            0 => Some(DeviceType::Default),
            1 => Some(DeviceType::Cpu),
            2 => Some(DeviceType::Sycl),
            3 => Some(DeviceType::Cuda),
            4 => Some(DeviceType::Hip),
            5 => Some(DeviceType::Metal),
            _ => None,
        }
    }
}

/// Pixel layout of a bound image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageFormat {
    Float = 1,
    Float2 = 2,
    Float3 = 3,
    Float4 = 4,
}

impl ImageFormat {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn channel_count(self) -> usize {
        self as usize
    }
}

/// Error state reported by an engine device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFault {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for EngineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Call surface of a learned denoising engine: devices own execution
/// resources, filters are configured operations bound to one device.
///
/// Calls that can fail leave an error on the device; callers read it back with
/// [`DenoiseEngine::take_device_error`]. Ordering between calls is not enforced
/// here, see [`crate::Device`] and [`crate::Filter`].
pub trait DenoiseEngine {
    type Device;
    type Filter;

    fn physical_device_count(&self) -> i32;

    fn physical_device_string(&self, index: i32, name: &CStr) -> Option<String>;

    fn new_device(&self, device_type: DeviceType) -> Option<Self::Device>;

    fn set_device_int(&self, device: &Self::Device, name: &CStr, value: i32);

    fn commit_device(&self, device: &Self::Device);

    /// Returns and clears the pending error of `device`.
    fn take_device_error(&self, device: &Self::Device) -> Option<EngineFault>;

    fn release_device(&self, device: Self::Device);

    fn new_filter(&self, device: &Self::Device, filter_type: &CStr) -> Option<Self::Filter>;

    /// Shares `byte_size` bytes at `data` with the filter without copying.
    ///
    /// # Safety
    /// `data` must stay valid and unmodified until the filter is committed.
    unsafe fn set_shared_filter_data(
        &self,
        filter: &Self::Filter,
        name: &CStr,
        data: *mut u8,
        byte_size: usize,
    );

    /// Shares a tightly packed image at `data` with the filter without copying.
    ///
    /// # Safety
    /// `data` must address `width * height` pixels of `format` and stay valid
    /// until the filter is released.
    unsafe fn set_shared_filter_image(
        &self,
        filter: &Self::Filter,
        name: &CStr,
        data: *mut f32,
        format: ImageFormat,
        width: usize,
        height: usize,
    );

    fn set_filter_bool(&self, filter: &Self::Filter, name: &CStr, value: bool);

    fn set_filter_int(&self, filter: &Self::Filter, name: &CStr, value: i32);

    fn set_filter_float(&self, filter: &Self::Filter, name: &CStr, value: f32);

    fn commit_filter(&self, filter: &Self::Filter);

    fn execute_filter(&self, filter: &Self::Filter);

    fn release_filter(&self, filter: Self::Filter);
}

impl<E: DenoiseEngine + ?Sized> DenoiseEngine for &E {
    type Device = E::Device;
    type Filter = E::Filter;

    fn physical_device_count(&self) -> i32 {
        (**self).physical_device_count()
    }

    fn physical_device_string(&self, index: i32, name: &CStr) -> Option<String> {
        (**self).physical_device_string(index, name)
    }

    fn new_device(&self, device_type: DeviceType) -> Option<Self::Device> {
        (**self).new_device(device_type)
    }

    fn set_device_int(&self, device: &Self::Device, name: &CStr, value: i32) {
        (**self).set_device_int(device, name, value)
    }

    fn commit_device(&self, device: &Self::Device) {
        (**self).commit_device(device)
    }

    fn take_device_error(&self, device: &Self::Device) -> Option<EngineFault> {
        (**self).take_device_error(device)
    }

    fn release_device(&self, device: Self::Device) {
        (**self).release_device(device)
    }

    fn new_filter(&self, device: &Self::Device, filter_type: &CStr) -> Option<Self::Filter> {
        (**self).new_filter(device, filter_type)
    }

    unsafe fn set_shared_filter_data(
        &self,
        filter: &Self::Filter,
        name: &CStr,
        data: *mut u8,
        byte_size: usize,
    ) {
        (**self).set_shared_filter_data(filter, name, data, byte_size)
    }

    unsafe fn set_shared_filter_image(
        &self,
        filter: &Self::Filter,
        name: &CStr,
        data: *mut f32,
        format: ImageFormat,
        width: usize,
        height: usize,
    ) {
        (**self).set_shared_filter_image(filter, name, data, format, width, height)
    }

    fn set_filter_bool(&self, filter: &Self::Filter, name: &CStr, value: bool) {
        (**self).set_filter_bool(filter, name, value)
    }

    fn set_filter_int(&self, filter: &Self::Filter, name: &CStr, value: i32) {
        (**self).set_filter_int(filter, name, value)
    }

    fn set_filter_float(&self, filter: &Self::Filter, name: &CStr, value: f32) {
        (**self).set_filter_float(filter, name, value)
    }

    fn commit_filter(&self, filter: &Self::Filter) {
        (**self).commit_filter(filter)
    }

    fn execute_filter(&self, filter: &Self::Filter) {
        (**self).execute_filter(filter)
    }

    fn release_filter(&self, filter: Self::Filter) {
        (**self).release_filter(filter)
    }
}
