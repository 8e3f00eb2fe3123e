use std::fmt::{Display, Formatter};
use std::mem::forget;
use std::str::Utf8Error;

/// Rust-allocated bytes handed to the host. The host gives it back through
/// `destroy_ffi_buf`.
#[repr(C)]
#[derive(Debug)]
pub struct FfiBuf {
    data: *mut u8,
    len: u32,
    cap: u32,
}

impl FfiBuf {
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }

    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(self.as_slice())
    }
}

impl Display for FfiBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_slice()))
    }
}

impl Default for FfiBuf {
    fn default() -> Self {
        FfiBuf {
            data: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }
}

impl Drop for FfiBuf {
    fn drop(&mut self) {
        if self.data.is_null() {
            return;
        }

        let len = self.len as usize;
        let cap = self.cap as usize;
        let ptr = self.data;

        unsafe {
            drop(Vec::from_raw_parts(ptr, len, cap));
        }
    }
}

impl From<&str> for FfiBuf {
    fn from(data: &str) -> Self {
        data.to_string().into()
    }
}

impl From<String> for FfiBuf {
    fn from(data: String) -> Self {
        let mut bytes = data.into_bytes();
        bytes.shrink_to_fit();

        let length = bytes.len() as u32;
        let capacity = bytes.capacity() as u32;
        let ptr = bytes.as_mut_ptr();

        forget(bytes);

        FfiBuf {
            data: ptr,
            len: length,
            cap: capacity,
        }
    }
}

impl TryFrom<FfiBuf> for String {
    type Error = Utf8Error;

    fn try_from(buf: FfiBuf) -> Result<Self, Self::Error> {
        Ok(buf.as_str()?.to_string())
    }
}

/// Host-owned UTF-8 string, borrowed for one call. A null `data` means the
/// argument was not supplied.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiStr {
    data: *const u8,
    len: usize,
}

impl FfiStr {
    pub fn null() -> Self {
        FfiStr {
            data: std::ptr::null(),
            len: 0,
        }
    }

    /// Borrows `value` without tracking its lifetime; `value` must outlive
    /// every use of the returned `FfiStr`.
    pub fn new(value: &str) -> Self {
        FfiStr {
            data: value.as_ptr(),
            len: value.len(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// # Safety
    /// A non-null `data` must point to `len` readable bytes that stay valid and
    /// unmodified for `'a`.
    pub unsafe fn as_str<'a>(&self) -> Result<Option<&'a str>, Utf8Error> {
        if self.data.is_null() {
            return Ok(None);
        }

        let bytes = std::slice::from_raw_parts(self.data, self.len);
        std::str::from_utf8(bytes).map(Some)
    }
}
