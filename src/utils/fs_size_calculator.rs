//! This module contains functions to calculate the size of differennt fs components

use crate::fs::{INODE_SIZE, INODE_TABLE_START};

/// calculate needed Inode Table size in bytes
/// # Arguments
/// - `block_size`: the block size of the filesystem
/// # Return
/// the size of the Inode Table, one inode per inode bitmap bit
/// # Example
/// ```
/// use bobfs::utils::fs_size_calculator::inode_table_size;
/// use bobfs::fs::INODE_SIZE;
/// let block_size = 1024;
/// let table_size = inode_table_size(block_size);
/// assert_eq!(table_size, 1024 * 8 * INODE_SIZE);
/// ```
pub const fn inode_table_size(block_size: u32) -> u32 {
    block_size * 8 * INODE_SIZE
}

/// calculate how many blocks the Inode Table spans
/// # Example
/// ```
/// use bobfs::utils::fs_size_calculator::inode_table_blocks;
/// assert_eq!(inode_table_blocks(1024), 128);
/// ```
pub const fn inode_table_blocks(block_size: u32) -> u32 {
    inode_table_size(block_size) / block_size
}

/// calculate the first data block number
/// # Example
/// ```
/// use bobfs::utils::fs_size_calculator::data_start;
/// assert_eq!(data_start(1024), 131);
/// ```
pub const fn data_start(block_size: u32) -> u32 {
    INODE_TABLE_START + inode_table_blocks(block_size)
}

/// calculate data region size in bytes, one data block per block bitmap bit
pub const fn data_table_size(block_size: u32) -> u64 {
    block_size as u64 * block_size as u64 * 8
}

/// caculate the size of an image that can hold every addressable block
/// # Example
/// ```
/// use bobfs::utils::fs_size_calculator::image_size;
/// let block_size = 1024;
/// assert_eq!(image_size(block_size), 131 * 1024 + 1024 * 1024 * 8);
/// ```
pub const fn image_size(block_size: u32) -> u64 {
    data_start(block_size) as u64 * block_size as u64 + data_table_size(block_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{BLOCK_SIZE_U32, DATA_START, INODE_TABLE_BLOCKS};

    #[test]
    fn test_layout_constants_agree() {
        assert_eq!(INODE_TABLE_BLOCKS, inode_table_blocks(BLOCK_SIZE_U32));
        assert_eq!(DATA_START, data_start(BLOCK_SIZE_U32));
        assert_eq!(image_size(BLOCK_SIZE_U32) % BLOCK_SIZE_U32 as u64, 0);
    }
}
