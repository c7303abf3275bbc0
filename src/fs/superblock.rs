use serde::{Deserialize, Serialize};

use crate::utils::traits::OnDisk;

use super::{FS_MAGIC, ROOT_INODE};

/// The superblock of this filesystem, stored at the front of block 0,
/// the rest of the block is zero
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// magic tag, `BOBFS439`
    pub magic: [u8; 8],
    /// inode number of the root directory
    pub root_inum: u32,
}

impl SuperBlock {
    pub fn new(root_inum: u32) -> Self {
        Self {
            magic: *FS_MAGIC,
            root_inum,
        }
    }

    /// whether the magic tag identifies this filesystem
    pub fn is_valid(&self) -> bool {
        &self.magic == FS_MAGIC
    }
}

impl Default for SuperBlock {
    fn default() -> Self {
        Self::new(ROOT_INODE)
    }
}

impl OnDisk for SuperBlock {
    const SIZE: usize = 12;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superblock_layout() -> anyhow::Result<()> {
        let superblock = SuperBlock::new(0x0102_0304);
        let bytes = superblock.encode()?;
        assert_eq!(bytes.len(), SuperBlock::SIZE);
        assert_eq!(&bytes[..8], b"BOBFS439");
        assert_eq!(&bytes[8..], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(SuperBlock::decode(&bytes)?, superblock);
        Ok(())
    }

    #[test]
    fn test_foreign_magic_is_invalid() -> anyhow::Result<()> {
        let mut bytes = SuperBlock::default().encode()?;
        bytes[..8].copy_from_slice(b"EXT4FS!!");
        assert!(!SuperBlock::decode(&bytes)?.is_valid());
        Ok(())
    }
}
