use crate::error::{Error, Result};

/// Exclusive, stable view of a caller-owned pixel buffer for the duration of
/// one denoise call. The engine reads and writes the memory directly.
///
/// The view ends either through [`PinnedBuffer::commit`] once the engine has
/// finished, or by being dropped, which aborts. An abort after
/// [`PinnedBuffer::keep_rollback`] restores the snapshot, so the caller sees
/// the buffer as it was before the engine touched it, also when unwinding.
pub struct PinnedBuffer<'b> {
    pixels: &'b mut [f32],
    rollback: Option<Vec<f32>>,
    committed: bool,
}

impl<'b> PinnedBuffer<'b> {
    pub fn pin(pixels: &'b mut [f32]) -> Self {
        tracing::trace!("Pinned {} floats", pixels.len());

        Self {
            pixels,
            rollback: None,
            committed: false,
        }
    }

    /// Pins `len` floats starting at `data`.
    ///
    /// # Safety
    /// When non-null and aligned, `data` must point to `len` initialized
    /// floats that nothing else accesses until the returned value is dropped.
    pub unsafe fn from_raw(data: *mut f32, len: usize) -> Result<Self> {
        if data.is_null() || !data.is_aligned() {
            return Err(Error::PinFailed);
        }
        if len > isize::MAX as usize / std::mem::size_of::<f32>() {
            return Err(Error::PinFailed);
        }

        Ok(Self::pin(std::slice::from_raw_parts_mut(data, len)))
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut *self.pixels
    }

    /// Snapshots the current contents. Must be taken before the buffer is
    /// handed to anything that may write it.
    pub fn keep_rollback(&mut self) {
        self.rollback = Some(self.pixels.to_vec());
    }

    /// Ends the pin, keeping what the engine wrote.
    pub fn commit(mut self) {
        self.committed = true;
        self.rollback = None;
    }
}

impl Drop for PinnedBuffer<'_> {
    fn drop(&mut self) {
        if self.committed {
            tracing::trace!("Released pinned buffer with changes");
            return;
        }

        match self.rollback.take() {
            Some(snapshot) => {
                self.pixels.copy_from_slice(&snapshot);
                tracing::trace!("Released pinned buffer, restored {} floats", snapshot.len());
            }
            None => tracing::trace!("Released pinned buffer without committing changes"),
        }
    }
}
