//! Fallible buffer allocation for setup paths.

use crate::{Error, Result};

/// Allocate `len` zeroed samples, reporting allocation failure as an error.
pub fn try_zeroed<T: Default + Clone>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory(len))?;
    buffer.resize(len, T::default());
    Ok(buffer)
}
