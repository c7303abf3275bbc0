use bitvec::prelude::*;

use super::{FsError, Result, BITMAP_BITS, BLOCK_SIZE};

/// one block worth of allocation bits, bit `i` set means resource `i` is in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: BitVec<u8, Lsb0>,
}

impl Default for Bitmap {
    fn default() -> Self {
        Self {
            bits: bitvec![u8, Lsb0; 0; BITMAP_BITS as usize],
        }
    }
}

/// for serialize and deserialize
impl Bitmap {
    pub fn from_block(block: &[u8]) -> Result<Self> {
        if block.len() != BLOCK_SIZE {
            return Err(FsError::Codec(format!(
                "bitmap needs exactly {BLOCK_SIZE} bytes, got {}",
                block.len()
            )));
        }
        Ok(Self {
            bits: BitVec::<u8, Lsb0>::from_slice(block),
        })
    }

    pub fn as_block(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }
}

/// allocation
impl Bitmap {
    /// check if resource `i` is in use
    pub fn is_set(&self, i: u32) -> bool {
        self.bits.get(i as usize).as_deref().copied().unwrap_or(false)
    }

    /// calculate the number of free resources
    pub fn free_count(&self) -> usize {
        self.bits.count_zeros()
    }

    /// first-fit: claim the lowest clear bit
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.bits.first_zero()?;
        self.bits.set(index, true);
        Some(index as u32)
    }

    /// mark resource `i` as used
    pub fn occupy(&mut self, i: u32) {
        self.bits.set(i as usize, true);
    }

    /// release resource `i`
    /// # Returns
    /// whether the bit was set before
    pub fn release(&mut self, i: u32) -> bool {
        self.bits.replace(i as usize, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_except(free: &[u32]) -> Bitmap {
        let mut bitmap = Bitmap::from_block(&[0xff; BLOCK_SIZE]).unwrap();
        for i in free {
            bitmap.release(*i);
        }
        bitmap
    }

    // test allocate
    #[test]
    fn test_allocate() {
        // test if free space is at the beginning
        let mut bitmap1 = full_except(&[0]);
        assert_eq!(bitmap1.allocate(), Some(0));
        assert!(bitmap1.is_set(0));

        // test if free space is in the middle
        let mut bitmap2 = full_except(&[9]);
        assert_eq!(bitmap2.allocate(), Some(9));
        assert!(bitmap2.is_set(9));

        // test if free space is at the end
        let mut bitmap3 = full_except(&[BITMAP_BITS - 1]);
        assert_eq!(bitmap3.allocate(), Some(BITMAP_BITS - 1));
        assert!(bitmap3.is_set(BITMAP_BITS - 1));
        assert_eq!(bitmap3.allocate(), None);
    }

    #[test]
    fn test_first_fit_is_deterministic() {
        let mut bitmap = Bitmap::default();
        let allocated: Vec<u32> = (0..5).filter_map(|_| bitmap.allocate()).collect();
        assert_eq!(allocated, vec![0, 1, 2, 3, 4]);

        assert!(bitmap.release(2));
        assert!(!bitmap.release(2));
        assert_eq!(bitmap.allocate(), Some(2));
        assert_eq!(bitmap.free_count(), BITMAP_BITS as usize - 5);
    }

    #[test]
    fn test_bit_order_matches_block_bytes() {
        let mut bitmap = Bitmap::default();
        bitmap.occupy(0);
        bitmap.occupy(9);
        let block = bitmap.as_block();
        assert_eq!(block.len(), BLOCK_SIZE);
        assert_eq!(block[0], 0b0000_0001);
        assert_eq!(block[1], 0b0000_0010);
        assert_eq!(Bitmap::from_block(block).unwrap(), bitmap);
    }

    #[test]
    fn test_is_set_out_of_range() {
        let bitmap = Bitmap::from_block(&[0xff; BLOCK_SIZE]).unwrap();
        assert!(bitmap.is_set(BITMAP_BITS - 1));
        assert!(!bitmap.is_set(BITMAP_BITS));
    }
}
