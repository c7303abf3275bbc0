//! the pointer block that extends a node past its direct block
use super::{FsError, Result, BLOCK_SIZE, INDIRECT_CAPACITY};

const POINTER_SIZE: usize = std::mem::size_of::<u32>();

/// `INDIRECT_CAPACITY` little-endian block numbers, 0 meaning unassigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indirect {
    pointers: [u32; INDIRECT_CAPACITY],
}

impl Default for Indirect {
    fn default() -> Self {
        Self {
            pointers: [0; INDIRECT_CAPACITY],
        }
    }
}

impl Indirect {
    /// block number in slot `index`
    /// # Panics
    /// if `index >= INDIRECT_CAPACITY`
    pub fn get(&self, index: usize) -> u32 {
        self.pointers[index]
    }

    /// # Panics
    /// if `index >= INDIRECT_CAPACITY`
    pub fn set(&mut self, index: usize, block: u32) {
        self.pointers[index] = block;
    }

    /// every assigned block number, in slot order
    pub fn assigned(&self) -> impl Iterator<Item = u32> + '_ {
        self.pointers.iter().copied().filter(|block| *block != 0)
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < BLOCK_SIZE {
            return Err(FsError::Codec(format!(
                "indirect block needs {BLOCK_SIZE} bytes, got {}",
                buf.len()
            )));
        }
        let mut indirect = Indirect::default();
        for (pointer, bytes) in indirect
            .pointers
            .iter_mut()
            .zip(buf.chunks_exact(POINTER_SIZE))
        {
            *pointer = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Ok(indirect)
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        for (bytes, pointer) in buf.chunks_exact_mut(POINTER_SIZE).zip(self.pointers.iter()) {
            bytes.copy_from_slice(&pointer.to_le_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirect_layout() -> anyhow::Result<()> {
        let mut indirect = Indirect::default();
        indirect.set(0, 200);
        indirect.set(INDIRECT_CAPACITY - 1, 0x0102_0304);
        let buf = indirect.encode();
        assert_eq!(&buf[..4], &[200, 0, 0, 0]);
        assert_eq!(&buf[BLOCK_SIZE - 4..], &[4, 3, 2, 1]);
        assert!(buf[4..BLOCK_SIZE - 4].iter().all(|b| *b == 0));

        let decoded = Indirect::decode(&buf)?;
        assert_eq!(decoded, indirect);
        assert_eq!(decoded.assigned().collect::<Vec<_>>(), vec![200, 0x0102_0304]);
        Ok(())
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        assert!(Indirect::decode(&[0u8; 16]).is_err());
    }
}
