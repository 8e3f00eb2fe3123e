//! Intel Open Image Denoise backend, loaded at runtime.
//!
//! `OIDN_LIBRARY` names the shared library to load; otherwise the platform's
//! default names are tried on the loader path. The library is opened once per
//! process and a failed load is remembered.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::OnceLock;

use libloading::Library;

use crate::engine::{DenoiseEngine, DeviceType, EngineFault, ImageFormat};
use crate::error::{Error, Result};

pub const LIBRARY_ENV: &str = "OIDN_LIBRARY";

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["OpenImageDenoise.dll"];
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libOpenImageDenoise.2.dylib", "libOpenImageDenoise.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libOpenImageDenoise.so.2", "libOpenImageDenoise.so"];

type RawHandle = *mut c_void;

type NewDeviceFn = unsafe extern "C" fn(c_int) -> RawHandle;
type SetDeviceIntFn = unsafe extern "C" fn(RawHandle, *const c_char, c_int);
type DeviceFn = unsafe extern "C" fn(RawHandle);
type GetDeviceErrorFn = unsafe extern "C" fn(RawHandle, *mut *const c_char) -> c_int;
type NewFilterFn = unsafe extern "C" fn(RawHandle, *const c_char) -> RawHandle;
type SetSharedFilterDataFn = unsafe extern "C" fn(RawHandle, *const c_char, *mut c_void, usize);
type SetSharedFilterImageFn = unsafe extern "C" fn(
    RawHandle,
    *const c_char,
    *mut c_void,
    c_int,
    usize,
    usize,
    usize,
    usize,
    usize,
);
type SetFilterBoolFn = unsafe extern "C" fn(RawHandle, *const c_char, bool);
type SetFilterIntFn = unsafe extern "C" fn(RawHandle, *const c_char, c_int);
type SetFilterFloatFn = unsafe extern "C" fn(RawHandle, *const c_char, f32);
type FilterFn = unsafe extern "C" fn(RawHandle);
type GetNumPhysicalDevicesFn = unsafe extern "C" fn() -> c_int;
type GetPhysicalDeviceStringFn = unsafe extern "C" fn(c_int, *const c_char) -> *const c_char;

#[derive(Debug)]
pub struct OidnDevice(NonNull<c_void>);

#[derive(Debug)]
pub struct OidnFilter(NonNull<c_void>);

pub struct OidnLibrary {
    _lib: Library,
    path: PathBuf,

    new_device: NewDeviceFn,
    set_device_int: SetDeviceIntFn,
    commit_device: DeviceFn,
    get_device_error: GetDeviceErrorFn,
    release_device: DeviceFn,

    new_filter: NewFilterFn,
    set_shared_filter_data: SetSharedFilterDataFn,
    set_shared_filter_image: SetSharedFilterImageFn,
    set_filter_bool: SetFilterBoolFn,
    set_filter_int: SetFilterIntFn,
    set_filter_float: SetFilterFloatFn,
    commit_filter: FilterFn,
    execute_filter: FilterFn,
    release_filter: FilterFn,

    // Physical device queries only exist in 2.x builds.
    get_num_physical_devices: Option<GetNumPhysicalDevicesFn>,
    get_physical_device_string: Option<GetPhysicalDeviceStringFn>,
}

fn required<T: Copy>(lib: &Library, path: &Path, name: &str) -> Result<T> {
    // SAFETY: the caller of `OidnLibrary::load` vouches for the signatures.
    unsafe { lib.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|e| Error::EngineUnavailable(format!("{}: {}", path.display(), e)))
}

fn optional<T: Copy>(lib: &Library, name: &str) -> Option<T> {
    // SAFETY: as for `required`.
    unsafe { lib.get::<T>(name.as_bytes()) }
        .ok()
        .map(|symbol| *symbol)
}

impl OidnLibrary {
    /// Opens the library at `path` and resolves the C API.
    ///
    /// # Safety
    /// The library at `path` must be an Open Image Denoise build whose exported
    /// functions match the signatures above. Its initializers run on load.
    pub unsafe fn load(path: &Path) -> Result<Self> {
        let lib = Library::new(path)
            .map_err(|e| Error::EngineUnavailable(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            new_device: required(&lib, path, "oidnNewDevice")?,
            set_device_int: required(&lib, path, "oidnSetDeviceInt")?,
            commit_device: required(&lib, path, "oidnCommitDevice")?,
            get_device_error: required(&lib, path, "oidnGetDeviceError")?,
            release_device: required(&lib, path, "oidnReleaseDevice")?,
            new_filter: required(&lib, path, "oidnNewFilter")?,
            set_shared_filter_data: required(&lib, path, "oidnSetSharedFilterData")?,
            set_shared_filter_image: required(&lib, path, "oidnSetSharedFilterImage")?,
            set_filter_bool: required(&lib, path, "oidnSetFilterBool")?,
            set_filter_int: required(&lib, path, "oidnSetFilterInt")?,
            set_filter_float: required(&lib, path, "oidnSetFilterFloat")?,
            commit_filter: required(&lib, path, "oidnCommitFilter")?,
            execute_filter: required(&lib, path, "oidnExecuteFilter")?,
            release_filter: required(&lib, path, "oidnReleaseFilter")?,
            get_num_physical_devices: optional(&lib, "oidnGetNumPhysicalDevices"),
            get_physical_device_string: optional(&lib, "oidnGetPhysicalDeviceString"),
            _lib: lib,
            path: path.to_path_buf(),
        })
    }

    /// Process-wide library, loaded on first use.
    pub fn shared() -> Result<&'static OidnLibrary> {
        static LIBRARY: OnceLock<std::result::Result<OidnLibrary, String>> = OnceLock::new();

        LIBRARY
            .get_or_init(load_default)
            .as_ref()
            .map_err(|e| Error::EngineUnavailable(e.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_default() -> std::result::Result<OidnLibrary, String> {
    let candidates: Vec<PathBuf> = match std::env::var_os(LIBRARY_ENV) {
        Some(path) => vec![PathBuf::from(path)],
        None => DEFAULT_LIBRARY_NAMES.iter().map(PathBuf::from).collect(),
    };

    let mut last_err = "no denoise library candidates".to_string();
    for candidate in candidates {
        // SAFETY: candidates are Open Image Denoise builds.
        match unsafe { OidnLibrary::load(&candidate) } {
            Ok(library) => {
                tracing::info!("Denoise engine loaded from '{}'", candidate.display());
                return Ok(library);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                last_err = e.to_string();
            }
        }
    }

    Err(last_err)
}

// Every call below passes a handle created by this library and not yet
// released, and NUL-terminated names that outlive the call.
impl DenoiseEngine for OidnLibrary {
    type Device = OidnDevice;
    type Filter = OidnFilter;

    fn physical_device_count(&self) -> i32 {
        match self.get_num_physical_devices {
            Some(count) => unsafe { count() },
            None => 0,
        }
    }

    fn physical_device_string(&self, index: i32, name: &CStr) -> Option<String> {
        let query = self.get_physical_device_string?;
        let value = unsafe { query(index, name.as_ptr()) };
        if value.is_null() {
            return None;
        }

        // SAFETY: the engine returns a NUL-terminated string it keeps alive.
        Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
    }

    fn new_device(&self, device_type: DeviceType) -> Option<OidnDevice> {
        NonNull::new(unsafe { (self.new_device)(device_type.as_raw()) }).map(OidnDevice)
    }

    fn set_device_int(&self, device: &OidnDevice, name: &CStr, value: i32) {
        unsafe { (self.set_device_int)(device.0.as_ptr(), name.as_ptr(), value) }
    }

    fn commit_device(&self, device: &OidnDevice) {
        unsafe { (self.commit_device)(device.0.as_ptr()) }
    }

    fn take_device_error(&self, device: &OidnDevice) -> Option<EngineFault> {
        let mut message: *const c_char = std::ptr::null();
        let code = unsafe { (self.get_device_error)(device.0.as_ptr(), &mut message) };
        if code == 0 {
            return None;
        }

        let message = if message.is_null() {
            "unknown error".to_string()
        } else {
            // SAFETY: the engine returns a NUL-terminated message valid until
            // the next call on this device.
            unsafe { CStr::from_ptr(message) }
                .to_string_lossy()
                .into_owned()
        };

        Some(EngineFault { code, message })
    }

    fn release_device(&self, device: OidnDevice) {
        unsafe { (self.release_device)(device.0.as_ptr()) }
    }

    fn new_filter(&self, device: &OidnDevice, filter_type: &CStr) -> Option<OidnFilter> {
        NonNull::new(unsafe { (self.new_filter)(device.0.as_ptr(), filter_type.as_ptr()) })
            .map(OidnFilter)
    }

    unsafe fn set_shared_filter_data(
        &self,
        filter: &OidnFilter,
        name: &CStr,
        data: *mut u8,
        byte_size: usize,
    ) {
        (self.set_shared_filter_data)(
            filter.0.as_ptr(),
            name.as_ptr(),
            data as *mut c_void,
            byte_size,
        )
    }

    unsafe fn set_shared_filter_image(
        &self,
        filter: &OidnFilter,
        name: &CStr,
        data: *mut f32,
        format: ImageFormat,
        width: usize,
        height: usize,
    ) {
        // Zero offset and strides: packed rows.
        (self.set_shared_filter_image)(
            filter.0.as_ptr(),
            name.as_ptr(),
            data as *mut c_void,
            format.as_raw(),
            width,
            height,
            0,
            0,
            0,
        )
    }

    fn set_filter_bool(&self, filter: &OidnFilter, name: &CStr, value: bool) {
        unsafe { (self.set_filter_bool)(filter.0.as_ptr(), name.as_ptr(), value) }
    }

    fn set_filter_int(&self, filter: &OidnFilter, name: &CStr, value: i32) {
        unsafe { (self.set_filter_int)(filter.0.as_ptr(), name.as_ptr(), value) }
    }

    fn set_filter_float(&self, filter: &OidnFilter, name: &CStr, value: f32) {
        unsafe { (self.set_filter_float)(filter.0.as_ptr(), name.as_ptr(), value) }
    }

    fn commit_filter(&self, filter: &OidnFilter) {
        unsafe { (self.commit_filter)(filter.0.as_ptr()) }
    }

    fn execute_filter(&self, filter: &OidnFilter) {
        unsafe { (self.execute_filter)(filter.0.as_ptr()) }
    }

    fn release_filter(&self, filter: OidnFilter) {
        unsafe { (self.release_filter)(filter.0.as_ptr()) }
    }
}
