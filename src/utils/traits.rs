use bincode::config::{self, Configuration, Fixint, LittleEndian, NoLimit};
use serde::{de::DeserializeOwned, Serialize};

use crate::fs::{FsError, Result};

/// little-endian, fixed-width integers, no length prefixes for fixed arrays
#[inline]
pub fn on_disk_config() -> Configuration<LittleEndian, Fixint, NoLimit> {
    config::legacy()
}

/// Trait for records with a fixed on-disk layout
/// # Note
/// This trait is implemented through [Serialize] and [DeserializeOwned],
/// field order is the declaration order of the struct
pub trait OnDisk: Serialize + DeserializeOwned {
    /// encoded size in bytes
    const SIZE: usize;

    /// serialize into the front of `buf`
    /// # Returns
    /// The number of bytes written if successful
    fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(FsError::Codec(format!(
                "buffer of {} bytes can't hold a {} byte record",
                buf.len(),
                Self::SIZE
            )));
        }
        Ok(bincode::serde::encode_into_slice(
            self,
            &mut buf[..Self::SIZE],
            on_disk_config(),
        )?)
    }

    /// serialize into a [Vec](std::vec::Vec)
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, on_disk_config())?)
    }

    /// deserialize from the front of `buf`
    fn decode(buf: &[u8]) -> Result<Self> {
        let (object, _bytes_read): (Self, usize) =
            bincode::serde::decode_from_slice(buf, on_disk_config())?;
        Ok(object)
    }
}
